pub mod process_backend;
pub mod smtlib_printer;
