use quire_core::config::registry::Registry;

use crate::ThemesArgs;

pub fn run(args: &ThemesArgs) -> i32 {
    let registry = super::registry(&args.themes_dirs);
    for name in registry.theme_names() {
        match registry.theme(&name) {
            Some(info) => println!("{name}\t{}", info.dir.display()),
            None => println!("{name}"),
        }
    }
    0
}
