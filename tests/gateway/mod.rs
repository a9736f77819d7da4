mod bus_tests;
mod chain_tests;
mod command_tests;
mod role_tests;
mod room_tests;
mod session_tests;
mod socket_tests;
