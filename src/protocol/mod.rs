/*!
 * Wire clients for the backing stores
 *
 * - S3-compatible object listing (dudewhere bucket on R2)
 * - DynamoDB query (block index)
 *
 * The denylist is a plain HTTP check and lives with its adapter in
 * `backend::denylist`.
 */

pub mod dynamo;
pub mod s3;

pub use dynamo::DynamoClient;
pub use s3::{S3Client, S3Config};
