use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use rh_hash::HashTable;
use rh_hash::hash::fold;
use rh_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Maximum ratio of elements to buckets, `0.0` for the default.
    #[arg(short = 'l', long = "load_factor", default_value_t = 0.0)]
    load_factor: f32,

    /// Remove every n-th value after filling, `0` to skip.
    #[arg(short = 'r', long = "remove_every", default_value_t = 3)]
    remove_every: u64,
}

fn hash_u64(value: u64) -> u32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    fold(hasher.finish())
}

fn main() {
    let args = Args::parse();

    let mut table: HashTable<u64> = HashTable::new();
    table.set_load_factor(args.load_factor);
    table.reserve(args.target_capacity);

    println!(
        "Reserved {} slots (requested {}) at load factor {:.2}",
        table.capacity(),
        args.target_capacity,
        table.load_factor()
    );

    let num_values = table.capacity() as u64;
    for value in 0..num_values {
        match table.entry(hash_u64(value), |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!(
        "Inserted {} values using {} bytes",
        table.len(),
        table.allocation_size()
    );
    table.print_probe_histogram();
    table.debug_stats().print();

    if args.remove_every == 0 {
        return;
    }

    let mut removed = 0;
    for value in (0..num_values).step_by(args.remove_every as usize) {
        if table.remove(hash_u64(value), |&v| v == value).is_some() {
            removed += 1;
        }
    }

    println!();
    println!("Removed {removed} values, {} remain", table.len());
    table.print_probe_histogram();
    table.debug_stats().print();
    table.validate();
}
