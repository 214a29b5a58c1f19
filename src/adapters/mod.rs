pub mod openai;
pub mod tools;
