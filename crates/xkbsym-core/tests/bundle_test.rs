// Xkbsym Bundle Tests
//
// Loads the TOML bundles under tests/data and compiles their root includes.

use std::path::PathBuf;

use xkbsym_core::action::{Action, ModAction};
use xkbsym_core::keymap::{explicit, Keymap};
use xkbsym_core::{Bundle, BundleError, CompileError, MergeMode, SymbolsCompiler};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn compile(bundle: &mut Bundle, root: &str) -> (Keymap, Result<(), CompileError>) {
    let file = bundle.root_file(root).unwrap();
    let mut keymap = bundle.keymap(0);
    let result = SymbolsCompiler::new(&mut keymap, &mut bundle.library).compile(&file, MergeMode::Override);
    (keymap, result)
}

fn levels(keymap: &Keymap, name: &str, group: u32) -> Vec<String> {
    let symbols = &keymap.key(name).unwrap().symbols;
    (0..symbols.width)
        .map(|level| match symbols.syms_for(group, level) {
            [] => "NoSymbol".to_string(),
            syms => syms[0].to_string(),
        })
        .collect()
}

#[test]
fn test_load_basic_bundle() {
    let bundle = Bundle::from_toml_path(data_path("basic.toml")).unwrap();

    assert_eq!(bundle.root, "pc+us+de:2");
    assert_eq!(bundle.library.len(), 4);
    assert!(bundle.types.is_empty());
    assert!(!bundle.keycodes.is_empty());
}

#[test]
fn test_compile_two_layouts() {
    let mut bundle = Bundle::from_toml_path(data_path("basic.toml")).unwrap();
    let root = bundle.root.clone();
    let (keymap, result) = compile(&mut bundle, &root);
    assert_eq!(result, Ok(()));

    assert_eq!(keymap.symbols_section_name.as_deref(), Some("pc+us+de:2"));
    let names: Vec<&str> = keymap
        .group_names
        .iter()
        .map(|n| keymap.ctx.atoms.text_or_none(*n))
        .collect();
    assert_eq!(names, vec!["English (US)", "German"]);

    // US letters on group 1, the German layer lands on group 2
    let ac01 = &keymap.key("AC01").unwrap().symbols;
    assert_eq!(ac01.num_groups, 2);
    assert_eq!(ac01.width, 4);
    assert_eq!(levels(&keymap, "AC01", 0), vec!["a", "A", "NoSymbol", "NoSymbol"]);
    assert_eq!(levels(&keymap, "AC01", 1), vec!["a", "A", "ae", "AE"]);

    let ad06 = &keymap.key("AD06").unwrap().symbols;
    assert_eq!(ad06.num_groups, 2);
    assert!(ad06.syms_for(0, 0).is_empty());
    assert_eq!(levels(&keymap, "AD06", 1), vec!["z", "Z"]);
    assert!(!ad06.repeats);
    assert_ne!(ad06.explicit & explicit::REPEAT, 0);

    assert_eq!(levels(&keymap, "AD01", 0), vec!["q", "Q"]);
    assert_eq!(keymap.key("AD01").unwrap().symbols.num_groups, 1);
}

#[test]
fn test_compile_modmap_actions_and_vmods() {
    let mut bundle = Bundle::from_toml_path(data_path("basic.toml")).unwrap();
    let (keymap, result) = compile(&mut bundle, "pc+us");
    assert_eq!(result, Ok(()));

    assert_eq!(keymap.key("CAPS").unwrap().modmap, 1 << 1);
    assert_eq!(keymap.key("LFSH").unwrap().modmap, 1 << 0);

    let lfsh = &keymap.key("LFSH").unwrap().symbols;
    assert_eq!(
        lfsh.action_for(0, 0),
        Action::SetMods(ModAction {
            mods: 1,
            ..Default::default()
        })
    );

    let nmlk = &keymap.key("NMLK").unwrap().symbols;
    assert_eq!(keymap.vmods.find("NumLock"), Some(0));
    assert_eq!(nmlk.vmodmap, 1);
    assert_ne!(nmlk.explicit & explicit::VMODMAP, 0);
}

#[test]
fn test_compile_alternate_map() {
    let mut bundle = Bundle::from_toml_path(data_path("basic.toml")).unwrap();
    let (keymap, result) = compile(&mut bundle, "pc+us(intl)");
    assert_eq!(result, Ok(()));

    assert_eq!(
        levels(&keymap, "AD01", 0),
        vec!["q", "Q", "adiaeresis", "Adiaeresis"]
    );
    assert_eq!(levels(&keymap, "AC01", 0), vec!["a", "A"]);
    assert_eq!(keymap.key("AD06").unwrap().symbols.num_groups, 0);
}

#[test]
fn test_compile_unknown_map_fails() {
    let mut bundle = Bundle::from_toml_path(data_path("basic.toml")).unwrap();
    let (keymap, result) = compile(&mut bundle, "pc+us(dvorak)");

    assert!(result.is_err());
    assert!(keymap.symbols_section_name.is_none());
    assert!(keymap.vmods.is_empty());
}

#[test]
fn test_bundle_rejects_bad_statements() {
    let unknown_field = r#"
root = "us"

[[units]]
file = "us"
statements = [{ key = "<AD01>", symbolz = [["q"]] }]
"#;
    assert!(matches!(
        Bundle::from_toml(unknown_field),
        Err(BundleError::TomlParse(_))
    ));

    let bad_action = r#"
root = "us"

[[units]]
file = "us"
statements = [{ key = "<AD01>", actions = [["SetMods(modifiers="]] }]
"#;
    assert!(matches!(
        Bundle::from_toml(bad_action),
        Err(BundleError::Expr { .. })
    ));

    let bad_merge = r#"
root = "us"

[[units]]
file = "us"
statements = [{ include = "pc", merge = "sideways" }]
"#;
    assert!(matches!(
        Bundle::from_toml(bad_merge),
        Err(BundleError::InvalidMerge(_))
    ));
}
