pub mod authors;
pub mod books;
pub mod genres;
pub mod home;
pub mod instances;

use lectern_kernel::ModuleRegistry;

/// Register all catalog modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(home::create_module());
    registry.register(authors::create_module());
    registry.register(genres::create_module());
    registry.register(books::create_module());
    registry.register(instances::create_module());
}
