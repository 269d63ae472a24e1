#![no_main]

use idom::{FindMode, NodeId, Tree};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 4] = ["a", "b", "svg:a", "B"];
const POOL: usize = 16;

// Every byte pair is one edit against a fixed pool; the `tree-invariants`
// feature makes the library panic on any structural corruption.
fuzz_target!(|data: &[u8]| {
    let mut tree = Tree::new();
    let doc = tree.create_document();
    let mut pool: Vec<NodeId> = vec![doc];
    for i in 1..POOL {
        let name = NAMES[i % NAMES.len()];
        let id = match i % 4 {
            0 | 1 => tree.create_element(name),
            2 => tree.create_text(name),
            _ => tree.create_cdata(name),
        };
        pool.push(id);
    }

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        let group = pool[(arg >> 4) as usize % POOL];
        let item = pool[(arg & 0x0f) as usize % POOL];
        let pos = (op >> 4) as usize;
        let _ = match op & 0x0f {
            0 | 1 => tree.append_child(group, item),
            2 => tree.insert_at(group, pos, item),
            3 => tree.set_at(group, pos, item).map(drop),
            4 => tree.remove_at(group, pos).map(drop),
            5 => tree.detach(item).map(drop),
            6 => tree.detach_all(group).map(drop),
            7 => tree.set_name(item, NAMES[pos % NAMES.len()]),
            8 => tree.coalesce(group, pos % 2 == 0).map(drop),
            9 => tree.insert_before(group, item, pool[pos % POOL]),
            10 => {
                // `pos` supplies the high byte so RECURSIVE is reachable.
                let mode = FindMode::from_bits_truncate(u16::from_le_bytes([arg, op >> 4]));
                tree.find_elements(group, None, NAMES[pos % NAMES.len()], mode).map(drop)
            }
            _ => tree.find_element(group, None, "a|b", FindMode::REGEX | FindMode::RECURSIVE).map(drop),
        };
    }

    for id in &pool {
        let root = tree.root_of(*id).expect("pool item is live");
        tree.check_invariants(root).expect("invariants hold");
    }
});
