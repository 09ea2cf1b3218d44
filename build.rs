//! Build script for the embedded result-cache migrations.
//!
//! `embed_migrations!` compiles the SQL under `migrations/` into the crate,
//! but Cargo does not track those files on its own. Emitting
//! `rerun-if-changed` makes edits to the cache schema trigger a rebuild.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
