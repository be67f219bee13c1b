use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("keysym_type.rs");
    let mut f = File::create(&dest_path).unwrap();

    // Generate the Keysym newtype wrapper
    writeln!(
        f,
        r#"
/// Represents a single keysym value.
///
/// This is a newtype wrapper around u32 for type safety.
/// The numeric values match the X11 keysym encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Keysym(pub u32);

impl Keysym {{
    /// Get the raw numeric keysym value
    pub fn raw(self) -> u32 {{
        self.0
    }}

    /// Get the name of this keysym, if it has one
    pub fn name(self) -> Option<&'static str> {{
        keysym_name(self)
    }}
}}

impl From<u32> for Keysym {{
    fn from(value: u32) -> Self {{
        Keysym(value)
    }}
}}

impl From<Keysym> for u32 {{
    fn from(sym: Keysym) -> Self {{
        sym.0
    }}
}}

impl fmt::Display for Keysym {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        match self.name() {{
            Some(name) => write!(f, "{{}}", name),
            None => write!(f, "0x{{:08x}}", self.0),
        }}
    }}
}}

impl FromStr for Keysym {{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {{
        keysym_from_name(s).ok_or_else(|| format!("Unknown keysym: {{}}", s))
    }}
}}
"#
    )
    .unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
