

#[cfg(test)]
pub mod node_tests;
