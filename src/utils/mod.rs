pub mod file_io;

pub(crate) use file_io::*;

#[cfg(test)]
mod file_io_test;
