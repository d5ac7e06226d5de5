pub use driver::MigrationDriver;

mod driver;
