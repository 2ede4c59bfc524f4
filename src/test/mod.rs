mod addresses;
mod fib;
mod ping_stats;
mod run_driver;
mod session;
