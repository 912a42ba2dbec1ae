pub mod reverse;
pub mod similar;
