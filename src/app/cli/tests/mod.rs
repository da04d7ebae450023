//! CLI test modules

mod args_tests;
