pub mod susar;
