//! End-to-end: synthesize an archive, inject a payload, re-load the output.

use psb::archive::Psb;
use psb::container;
use psb::encode;
use psb::format::{Header, ALIGNMENT, HEADER_LENGTH};
use psb::repack;
use psb::tree::{Entry, Tree, Value};

/// Build the three name-table arrays for a list of names.
///
/// Inverse of the decoder's backward chase: every name gets a chain of trie
/// nodes, shared along common prefixes. Each parent gets a block of 256
/// candidate child ids (`offsets[parent] + byte`), which keeps ids unique
/// without any real allocation strategy. Wasteful, but only tests read it.
fn name_tables(names: &[&str]) -> (Vec<u64>, Vec<u64>, Vec<u64>) {
	use std::collections::HashMap;

	let mut offsets = vec![u64::MAX]; // offsets[parent]: child block base
	let mut jumps = vec![0u64];
	let mut starts = Vec::with_capacity(names.len());
	let mut nodes: HashMap<Vec<u8>, u64> = HashMap::new();
	let mut next_base = 1u64;

	for name in names {
		let mut prefix = Vec::new();
		let mut parent = 0u64;
		for &byte in name.as_bytes() {
			prefix.push(byte);
			let node = match nodes.get(&prefix) {
				Some(&node) => node,
				None => {
					if offsets[parent as usize] == u64::MAX {
						offsets[parent as usize] = next_base;
						next_base += 256;
					}
					let node = offsets[parent as usize] + u64::from(byte);
					let len = (node as usize + 1).max(offsets.len());
					offsets.resize(len, u64::MAX);
					jumps.resize(len, 0);
					jumps[node as usize] = parent;
					nodes.insert(prefix.clone(), node);
					node
				}
			};
			parent = node;
		}
		starts.push(parent);
	}

	// unused slots must not underflow the chase if ever reached
	for slot in &mut offsets {
		if *slot == u64::MAX {
			*slot = 0;
		}
	}
	(offsets, jumps, starts)
}

struct Built {
	decoded: Vec<u8>,
	blob: Vec<u8>,
}

const NAMES: &[&str] = &["file_info", "meta", "system/roms/game", "system/data/misc"];
const META_STRING: &[u8] = b"emu-meta";

/// A two-subfile archive: a 100-byte ROM at offset 0 and a 50-byte data
/// file at offset 2048.
fn build_archive() -> Built {
	let (offsets, jumps, starts) = name_tables(NAMES);
	let mut names_region = encode::int_array(&offsets);
	names_region.extend_from_slice(&encode::int_array(&jumps));
	names_region.extend_from_slice(&encode::int_array(&starts));

	let mut tree = Tree::new();
	let rom_offset = tree.push(Value::Integer(0));
	let rom_length = tree.push(Value::Integer(100));
	let rom_pair = tree.push(Value::List(vec![rom_offset, rom_length]));
	let misc_offset = tree.push(Value::Integer(2048));
	let misc_length = tree.push(Value::Integer(50));
	let misc_pair = tree.push(Value::List(vec![misc_offset, misc_length]));
	let file_info = tree.push(Value::Object(vec![
		Entry { name_index: 2, name: NAMES[2].into(), node: rom_pair },
		Entry { name_index: 3, name: NAMES[3].into(), node: misc_pair },
	]));
	let meta = tree.push(Value::StringRef(0));
	let root = tree.push(Value::Object(vec![
		Entry { name_index: 0, name: NAMES[0].into(), node: file_info },
		Entry { name_index: 1, name: NAMES[1].into(), node: meta },
	]));
	let entries_region = encode::value(&tree, root);

	let string_offsets = encode::int_array(&[0]);
	let mut string_data = META_STRING.to_vec();
	string_data.push(0);
	let empty = encode::int_array(&[]);

	let names_at = HEADER_LENGTH as u32;
	let entries_at = names_at + names_region.len() as u32;
	let strings_at = entries_at + entries_region.len() as u32;
	let strings_data_at = strings_at + string_offsets.len() as u32;
	let chunk_offsets_at = strings_data_at + string_data.len() as u32;
	let chunk_lengths_at = chunk_offsets_at + empty.len() as u32;
	let chunk_data_at = chunk_lengths_at + empty.len() as u32;

	let header = Header {
		signature: b"PSB\0".to_vec(),
		format_type: 2,
		unknown: 0,
		offset_names: names_at,
		offset_strings: strings_at,
		offset_strings_data: strings_data_at,
		offset_chunk_offsets: chunk_offsets_at,
		offset_chunk_lengths: chunk_lengths_at,
		offset_chunk_data: chunk_data_at,
		offset_entries: entries_at,
	};

	let mut decoded = header.to_wire().expect("header");
	decoded.extend_from_slice(&names_region);
	decoded.extend_from_slice(&entries_region);
	decoded.extend_from_slice(&string_offsets);
	decoded.extend_from_slice(&string_data);
	decoded.extend_from_slice(&empty);
	decoded.extend_from_slice(&empty);

	let mut blob = vec![0u8; 2048 + 2048];
	for (i, byte) in blob.iter_mut().take(100).enumerate() {
		*byte = i as u8;
	}
	for byte in blob.iter_mut().skip(2048).take(50) {
		*byte = 0xAB;
	}

	Built { decoded, blob }
}

/// Deterministic, roughly incompressible payload.
fn payload(len: usize) -> Vec<u8> {
	let mut x = 0x1234_5678u32;
	(0..len)
		.map(|_| {
			x = x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
			(x >> 24) as u8
		})
		.collect()
}

#[test]
fn load_sees_the_synthesized_archive() {
	let built = build_archive();
	let container = container::wrap(&built.decoded, "alldata.psb.m").expect("wrap");
	let mut psb = Psb::load(&container, "alldata.psb.m").expect("load");

	assert_eq!(psb.names.len(), NAMES.len());
	assert_eq!(psb.strings, vec![META_STRING.to_vec()]);
	assert_eq!(psb.file_info.len(), 2);
	assert_eq!(psb.subfile_offset(0), 0);
	assert_eq!(psb.subfile_length(0), 100);
	assert_eq!(psb.subfile_offset(1), 2048);
	assert_eq!(psb.subfile_length(1), 50);
	assert_eq!(repack::rom_index(&psb).expect("rom"), 0);

	psb.attach_blob(&built.blob).expect("attach");
	assert_eq!(psb.subfiles[0][..4], [0, 1, 2, 3]);
	assert_eq!(psb.subfiles[1], vec![0xAB; 50]);
}

#[test]
fn assemble_reproduces_the_decoded_buffer() {
	let built = build_archive();
	let mut psb = Psb::parse(&built.decoded).expect("parse");
	assert_eq!(psb.assemble().expect("assemble"), built.decoded);
}

#[test]
fn short_blob_is_fatal() {
	let built = build_archive();
	let mut psb = Psb::parse(&built.decoded).expect("parse");
	assert!(psb.attach_blob(&built.blob[..1024]).is_err());
}

#[test]
fn inject_and_reload() {
	let built = build_archive();
	let container = container::wrap(&built.decoded, "alldata.psb.m").expect("wrap");
	let mut psb = Psb::load(&container, "alldata.psb.m").expect("load");
	psb.attach_blob(&built.blob).expect("attach");

	let rom = payload(2500);
	let index = repack::rom_index(&psb).expect("rom");
	repack::replace_subfile(&mut psb, index, &rom).expect("replace");

	// the sealed replacement is bigger than one alignment unit, so the
	// second subfile must have moved to the next boundary past it
	let sealed_len = psb.subfile_length(0);
	assert!(sealed_len > 2048 && sealed_len < 4096);
	assert_eq!(psb.subfile_offset(1), 4096);

	let out_container = psb.store("alldata.psb.m").expect("store");
	let out_blob = psb.blob();
	assert_eq!(out_blob.len() as u64 % ALIGNMENT, 0);

	let mut back = Psb::load(&out_container, "alldata.psb.m").expect("reload");
	assert_eq!(back.tree, psb.tree);
	assert_eq!(back.strings, psb.strings);
	back.attach_blob(&out_blob).expect("attach output blob");

	// offsets stay aligned, ordered, and tight
	for i in 0..back.file_info.len() - 1 {
		let end = back.subfile_offset(i) + back.subfile_length(i);
		let next = back.subfile_offset(i + 1);
		assert_eq!(next % ALIGNMENT, 0);
		assert!(next >= end);
		assert!(next - end < ALIGNMENT);
	}

	// the injected subfile unseals back to the payload, keyed by its own
	// subfile name
	let sealed = &back.subfiles[0];
	let recovered = container::unwrap(sealed, "system/roms/game").expect("unseal");
	assert_eq!(recovered, rom);

	// the untouched subfile came through byte-identical
	assert_eq!(back.subfiles[1], vec![0xAB; 50]);
}
