mod test_server;
mod test_wire;
