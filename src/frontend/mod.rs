pub mod scanner;
pub mod token;
pub mod token_dumper;
