pub mod iceberg;
