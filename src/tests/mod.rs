// Scenario tests for the streaming node, run on the host against fake drivers


#[cfg(test)]
mod server_tests;

#[cfg(test)]
mod stream_tests;

#[cfg(test)]
mod network_tests;

#[cfg(test)]
mod startup_tests;
