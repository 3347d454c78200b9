use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::{self, Write};

use crate::listing::ContainerRecord;

const BUILDER_MARK: &str = "   *";

// ======================================================
// TEXT TABLE
// ======================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Print only container IDs.
    pub quiet: bool,
    pub noheading: bool,
    /// Show full IDs instead of clipping them to 12 characters.
    pub notruncate: bool,
}

/// Write records as a fixed-width table. Nothing is written for an empty
/// listing; the heading only precedes the first row.
pub fn print_table<W: Write>(
    out: &mut W,
    records: &[ContainerRecord],
    opts: &TableOptions,
) -> io::Result<()> {
    for (n, record) in records.iter().enumerate() {
        if n == 0 && !opts.noheading && !opts.quiet {
            write_heading(out, opts.notruncate)?;
        }

        if opts.quiet {
            writeln!(out, "{}", record.container_id)?;
            continue;
        }

        let mark = if record.builder { BUILDER_MARK } else { "" };

        if opts.notruncate {
            writeln!(
                out,
                "{:<64} {:<8} {:<64} {:<32} {}",
                record.container_id, mark, record.image_id, record.image_name, record.container_name
            )?;
        } else {
            writeln!(
                out,
                "{:<12.12}  {:<8} {:<12.12} {:<32} {}",
                record.container_id, mark, record.image_id, record.image_name, record.container_name
            )?;
        }
    }

    Ok(())
}

fn write_heading<W: Write>(out: &mut W, notruncate: bool) -> io::Result<()> {
    if notruncate {
        writeln!(
            out,
            "{:<64} {:<8} {:<64} {:<32} {}",
            "CONTAINER ID", "BUILDER", "IMAGE ID", "IMAGE NAME", "CONTAINER NAME"
        )
    } else {
        writeln!(
            out,
            "{:<12}  {:<8} {:<12} {:<32} {}",
            "CONTAINER ID", "BUILDER", "IMAGE ID", "IMAGE NAME", "CONTAINER NAME"
        )
    }
}

// ======================================================
// JSON OUTPUT
// ======================================================

/// Write all records as one pretty-printed JSON array.
pub fn print_json<W: Write>(out: &mut W, records: &[ContainerRecord]) -> io::Result<()> {
    let mut ser = Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    writeln!(out)
}
