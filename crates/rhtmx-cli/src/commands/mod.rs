pub mod build;
pub mod match_path;
pub mod routes;
