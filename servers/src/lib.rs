//! Wiring shared by the `server_inventory` and `inventory_watch` binaries.

pub mod inventory_logic;
