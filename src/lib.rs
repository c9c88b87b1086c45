pub mod cli;
pub mod codegen;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod golang;
pub mod ir;
pub mod lower;
pub mod path_de;
