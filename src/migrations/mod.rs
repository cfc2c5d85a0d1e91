mod m0001_counter_titles;
mod m0002_counter_requests;
mod m0003_counter_aggregates;

use cetane::prelude::MigrationRegistry;

pub fn registry() -> MigrationRegistry {
    let mut reg = MigrationRegistry::new();
    reg.register(m0001_counter_titles::migration());
    reg.register(m0002_counter_requests::migration());
    reg.register(m0003_counter_aggregates::migration());
    reg
}
