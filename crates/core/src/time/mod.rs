pub mod austin;
