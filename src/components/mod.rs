pub mod pointer;
pub mod toast;
pub mod tools;
