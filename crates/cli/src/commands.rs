pub mod compare;
pub mod run;
pub mod schema;
pub mod stream;
