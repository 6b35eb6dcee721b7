//! Classical writer mode
//!
//! Every object inline, a fixed-width `xref` table, a `trailer`
//! dictionary, `startxref` and `%%EOF`. Each table line is exactly twenty
//! bytes.

use crate::error::Result;
use crate::pdf::context::Context;
use crate::writer::{write_indirect, HEADER};

pub async fn write(ctx: &Context, objects_per_tick: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(HEADER);

    let refs = ctx.refs_sorted();
    let mut entries: Vec<(u32, u16, usize)> = Vec::with_capacity(refs.len());
    let mut since_yield = 0u32;
    for r in &refs {
        let value = ctx.resolve(*r);
        entries.push((r.num, r.gen, out.len()));
        write_indirect(&mut out, *r, value);

        since_yield += 1;
        if objects_per_tick > 0 && since_yield >= objects_per_tick {
            since_yield = 0;
            tokio::task::yield_now().await;
        }
    }

    let xref_offset = out.len();
    write_xref_table(&mut out, &entries);

    let size = ctx.largest_number() as i64 + 1;
    out.extend_from_slice(b"trailer\n");
    crate::writer::write_value(
        &mut out,
        &crate::pdf::object::Object::Dict(ctx.trailer().to_dict(size)),
    );
    out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    Ok(out)
}

/// The table groups contiguous object numbers into subsections; the head
/// of the free list (object 0) always leads.
fn write_xref_table(out: &mut Vec<u8>, entries: &[(u32, u16, usize)]) {
    out.extend_from_slice(b"xref\n");

    let mut rows: Vec<(u32, String)> = Vec::with_capacity(entries.len() + 1);
    rows.push((0, "0000000000 65535 f \n".to_string()));
    for &(num, gen, offset) in entries {
        rows.push((num, format!("{:010} {:05} n \n", offset, gen)));
    }
    rows.sort_by_key(|(num, _)| *num);
    rows.dedup_by_key(|(num, _)| *num);

    let mut i = 0usize;
    while i < rows.len() {
        let start = rows[i].0;
        let mut end = i + 1;
        while end < rows.len() && rows[end].0 == rows[end - 1].0 + 1 {
            end += 1;
        }
        out.extend_from_slice(format!("{} {}\n", start, end - i).as_bytes());
        for (_, line) in &rows[i..end] {
            debug_assert_eq!(line.len(), 20);
            out.extend_from_slice(line.as_bytes());
        }
        i = end;
    }
}
