// Xkbsym CLI
// Compiles the symbols section of a layout bundle and prints the key table

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Parser;

use xkbsym_core::config::Bundle;
use xkbsym_core::settings::Settings;
use xkbsym_core::{Keymap, MergeMode, SymbolsCompiler};

/// XKB-style symbols compiler
#[derive(Parser, Debug)]
#[command(name = "xkbsym")]
#[command(author = "xkbsym contributors")]
#[command(version = "0.2.1")]
#[command(about = "Compile keyboard symbols from a layout bundle", long_about = None)]
struct Args {
    /// TOML layout bundle
    #[arg(short, long, value_name = "BUNDLE")]
    bundle: PathBuf,

    /// Include string to compile instead of the bundle's root
    #[arg(short, long, value_name = "INCLUDE")]
    root: Option<String>,

    /// Settings file (defaults to ~/.config/xkbsym/settings.toml)
    #[arg(short, long, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Enable debug logging and verbose diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Compile and exit without printing the key table
    #[arg(long)]
    check: bool,
}

/// Verbosity used for diagnostics when --verbose is given
const VERBOSE_LEVEL: i32 = 10;

struct Application {
    args: Args,
    settings: Settings,
    bundle: Bundle,
}

impl Application {
    fn new(args: Args) -> Result<Self> {
        let mut settings = match &args.settings {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("failed to load settings {}", path.display()))?,
            None => Settings::load_default().context("failed to load default settings")?,
        };
        if args.verbose {
            settings.set_verbosity(VERBOSE_LEVEL);
        }

        let bundle = Bundle::from_toml_path(&args.bundle)
            .with_context(|| format!("failed to load bundle {}", args.bundle.display()))?;

        Ok(Self {
            args,
            settings,
            bundle,
        })
    }

    /// Compile the root include into a fresh keymap
    fn compile(&mut self) -> Result<Keymap> {
        let root = self
            .args
            .root
            .clone()
            .unwrap_or_else(|| self.bundle.root.clone());
        let file = self.bundle.root_file(&root)?;

        let mut keymap = self.bundle.keymap(self.settings.verbosity());
        SymbolsCompiler::new(&mut keymap, &mut self.bundle.library)
            .with_max_include_depth(self.settings.max_include_depth())
            .compile(&file, MergeMode::Override)
            .with_context(|| format!("failed to compile symbols \"{}\"", root))?;

        Ok(keymap)
    }

    fn run(mut self) -> Result<()> {
        let keymap = self.compile()?;

        if self.args.check {
            println!("Symbols compiled");
            return Ok(());
        }

        for line in dump_keymap(&keymap) {
            println!("{}", line);
        }
        Ok(())
    }
}

/// One line per key with symbols: groups, width, types, keysyms and modmap
fn dump_keymap(keymap: &Keymap) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(name) = &keymap.symbols_section_name {
        lines.push(format!("symbols \"{}\"", name));
    }
    for (i, name) in keymap.group_names.iter().enumerate() {
        if let Some(name) = name {
            lines.push(format!("name[Group{}] = \"{}\"", i + 1, keymap.ctx.atoms.text(*name)));
        }
    }

    for key in &keymap.keys {
        let symbols = &key.symbols;
        if symbols.num_groups == 0 && key.modmap == 0 {
            continue;
        }

        let mut line = format!(
            "{} groups={} width={}",
            key.name, symbols.num_groups, symbols.width
        );
        for group in 0..symbols.num_groups {
            let levels: Vec<String> = (0..symbols.width)
                .map(|level| match symbols.syms_for(group, level) {
                    [] => "NoSymbol".to_string(),
                    [sym] => sym.to_string(),
                    syms => {
                        let names: Vec<String> = syms.iter().map(|s| s.to_string()).collect();
                        format!("{{{}}}", names.join(","))
                    }
                })
                .collect();
            line.push_str(&format!(
                " [{}: {}]",
                keymap.type_name(symbols.kt_index[group as usize]),
                levels.join(" ")
            ));
        }
        if key.modmap != 0 {
            line.push_str(&format!(" modmap={}", keymap.vmods.mask_text(key.modmap as u32)));
        }
        lines.push(line);
    }

    lines
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if !args.bundle.exists() {
        bail!("bundle {} does not exist", args.bundle.display());
    }

    Application::new(args)?.run()
}
