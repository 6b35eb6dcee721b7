//! Object-stream writer mode
//!
//! Eligible objects (non-streams at generation zero, excluding the
//! encryption dictionary) are packed into `/ObjStm` streams in groups;
//! everything else is emitted inline. The cross-reference is itself a
//! compressed stream with packed `(type, field2, field3)` rows behind a
//! PNG Up predictor, and the trailer fields are inlined into its dict.

use crate::error::Result;
use crate::pdf::context::Context;
use crate::pdf::filter::{flate, predictor};
use crate::pdf::object::{DictExt, Object, ObjRef};
use crate::pdf::xref::{self, FieldWidths, XrefEntry};
use crate::writer::{write_indirect, write_value, HEADER};

pub async fn write(ctx: &Context, objects_per_tick: u32) -> Result<Vec<u8>> {
    let group_size = objects_per_tick.max(1) as usize;
    let mut out = Vec::new();
    out.extend_from_slice(HEADER);

    // Partition: object streams may not hold streams, nonzero
    // generations, or the encryption dictionary.
    let encrypt = ctx.trailer().encrypt;
    let mut inline: Vec<ObjRef> = Vec::new();
    let mut packable: Vec<ObjRef> = Vec::new();
    for r in ctx.refs_sorted() {
        let is_stream = matches!(ctx.resolve(r), Object::Stream { .. });
        if is_stream || r.gen != 0 || Some(r) == encrypt {
            inline.push(r);
        } else {
            packable.push(r);
        }
    }

    let mut entries: Vec<(u32, XrefEntry)> = vec![(0, XrefEntry::Free { next: 0, gen: 0xFFFF })];
    let mut since_yield = 0u32;

    for r in &inline {
        entries.push((
            r.num,
            XrefEntry::InUse {
                offset: out.len() as u64,
                gen: r.gen,
            },
        ));
        write_indirect(&mut out, *r, ctx.resolve(*r));
        tick(&mut since_yield, objects_per_tick).await;
    }

    // Hosts take numbers above everything in the context
    let mut next_num = ctx.largest_number() + 1;
    for group in packable.chunks(group_size) {
        let host_num = next_num;
        next_num += 1;

        let mut prelude = String::new();
        let mut body = Vec::new();
        for (index, r) in group.iter().enumerate() {
            prelude.push_str(&format!("{} {} ", r.num, body.len()));
            write_value(&mut body, ctx.resolve(*r));
            body.push(b' ');
            entries.push((
                r.num,
                XrefEntry::InStream {
                    host: host_num,
                    index: index as u32,
                },
            ));
            tick(&mut since_yield, objects_per_tick).await;
        }

        let first = prelude.len();
        let mut payload = prelude.into_bytes();
        payload.extend_from_slice(&body);
        let compressed = flate::encode(&payload);

        entries.push((
            host_num,
            XrefEntry::InUse {
                offset: out.len() as u64,
                gen: 0,
            },
        ));
        write_indirect(
            &mut out,
            ObjRef::new(host_num, 0),
            &Object::Stream {
                dict: crate::dict! {
                    "Type" => "ObjStm",
                    "N" => group.len(),
                    "First" => first,
                    "Filter" => "FlateDecode",
                },
                data: compressed,
            },
        );
    }

    // The xref stream indexes itself, so its number and offset go in
    // before the rows are packed.
    let xref_num = next_num;
    let xref_offset = out.len();
    entries.push((
        xref_num,
        XrefEntry::InUse {
            offset: xref_offset as u64,
            gen: 0,
        },
    ));
    entries.sort_by_key(|(num, _)| *num);

    let widths = FieldWidths::minimal_for(&entries);
    let rows = xref::encode_entries(&entries, widths);
    let predicted = predictor::png_encode_up(&rows, widths.entry_width());
    let compressed = flate::encode(&predicted);

    let index: Vec<Object> = xref::index_ranges(&entries)
        .into_iter()
        .flat_map(|(start, count)| [Object::Int(start as i64), Object::Int(count as i64)])
        .collect();

    let mut dict = ctx.trailer().to_dict(xref_num as i64 + 1);
    dict.set("Type", "XRef");
    dict.set(
        "W",
        Object::Array(vec![
            Object::Int(widths.w0 as i64),
            Object::Int(widths.w1 as i64),
            Object::Int(widths.w2 as i64),
        ]),
    );
    dict.set("Index", Object::Array(index));
    dict.set("Filter", "FlateDecode");
    dict.set(
        "DecodeParms",
        Object::Dict(crate::dict! {
            "Predictor" => 12,
            "Columns" => widths.entry_width(),
        }),
    );
    write_indirect(
        &mut out,
        ObjRef::new(xref_num, 0),
        &Object::Stream {
            dict,
            data: compressed,
        },
    );

    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    Ok(out)
}

async fn tick(since_yield: &mut u32, objects_per_tick: u32) {
    if objects_per_tick == 0 {
        return;
    }
    *since_yield += 1;
    if *since_yield >= objects_per_tick {
        *since_yield = 0;
        tokio::task::yield_now().await;
    }
}
