mod common;
mod pipe_tests;
