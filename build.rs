use entities::ENTITIES;
use std::io::Write;
use std::{env, path::PathBuf};

fn main() {
    let out_dir: PathBuf = env::var("OUT_DIR").unwrap().parse().unwrap();

    // entity::lookup is handed the bare entity name, like "amp" for "&amp;";
    // only the forms with a trailing ";" participate in Markdown entity
    // parsing, so the rest are excluded here. The table is sorted by name so
    // the lookup can binary-search it.
    let mut named = ENTITIES
        .iter()
        .filter(|e| e.entity.starts_with('&') && e.entity.ends_with(';'))
        .collect::<Vec<_>>();
    named.sort_by_key(|e| e.entity);

    let out = std::fs::File::create(out_dir.join("entitydata.rs")).unwrap();
    let mut bw = std::io::BufWriter::new(out);
    writeln!(bw, "mod entitydata {{").unwrap();
    writeln!(
        bw,
        "    pub static NAMED_ENTITIES: &[(&str, &str); {}] = &[",
        named.len()
    )
    .unwrap();
    for e in named {
        writeln!(
            bw,
            "        ({:?}, {:?}),",
            &e.entity[1..e.entity.len() - 1],
            &e.characters
        )
        .unwrap();
    }
    writeln!(bw, "    ];").unwrap();
    writeln!(bw, "}}").unwrap();
}
