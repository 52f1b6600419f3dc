//! Whole-lifecycle scenarios for the radix tree: preallocation shape,
//! longest-prefix match, busy/not-found outcomes, and the 128-bit
//! instantiation.

use region_pool::{Ipv4RadixTree, Ipv6RadixTree, InsertError, Pool, Preallocate, NO_VALUE};

#[test]
fn preallocate_builds_a_complete_subtree_of_the_requested_depth() {
    let pool = Pool::create(4096).unwrap();
    // Depth 3 builds 2 + 4 + 8 = 14 non-root nodes; every one of them
    // should answer find() with NO_VALUE until something is inserted.
    let tree: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::Depth(3)).unwrap();
    assert_eq!(tree.find(0), NO_VALUE);
    assert_eq!(tree.find(u32::MAX), NO_VALUE);
}

#[test]
fn longest_prefix_match_prefers_the_most_specific_route() {
    let pool = Pool::create(4096).unwrap();
    let mut tree: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::None).unwrap();

    tree.insert(0x0A00_0000, 0xFF00_0000, 100).unwrap(); // 10.0.0.0/8
    tree.insert(0x0A0A_0000, 0xFFFF_0000, 200).unwrap(); // 10.10.0.0/16
    tree.insert(0x0A0A_0A00, 0xFFFF_FF00, 300).unwrap(); // 10.10.10.0/24

    assert_eq!(tree.find(0x0A0A_0A05), 300);
    assert_eq!(tree.find(0x0A0A_0B05), 200);
    assert_eq!(tree.find(0x0A0B_0000), 100);
    assert_eq!(tree.find(0x0B00_0000), NO_VALUE);
}

#[test]
fn reinserting_a_live_prefix_is_busy() {
    let pool = Pool::create(4096).unwrap();
    let mut tree: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::None).unwrap();
    tree.insert(0, 0xFFFF_FFFF, 1).unwrap();
    assert_eq!(tree.insert(0, 0xFFFF_FFFF, 2), Err(InsertError::Busy));
}

#[test]
fn deleting_frees_the_slot_for_a_later_insert_at_the_same_prefix() {
    let pool = Pool::create(4096).unwrap();
    let mut tree: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::None).unwrap();
    tree.insert(0, 0xFFFF_FFFF, 1).unwrap();
    tree.delete(0, 0xFFFF_FFFF).unwrap();
    tree.insert(0, 0xFFFF_FFFF, 2).unwrap();
    assert_eq!(tree.find(0), 2);
}

#[test]
fn ipv6_shaped_tree_longest_prefix_match() {
    let pool = Pool::create(4096).unwrap();
    let mut tree: Ipv6RadixTree = Ipv6RadixTree::create(&pool, Preallocate::None).unwrap();

    let mut key_32 = [0u8; 16];
    key_32[0] = 0x20;
    key_32[1] = 0x01;
    key_32[2] = 0x0D;
    key_32[3] = 0xB8;
    let mut mask_32 = [0u8; 16];
    mask_32[0] = 0xFF;
    mask_32[1] = 0xFF;
    mask_32[2] = 0xFF;
    mask_32[3] = 0xFF;
    tree.insert(key_32, mask_32, 1).unwrap();

    let mut key_48 = key_32;
    key_48[4] = 0xAB;
    key_48[5] = 0xCD;
    let mut mask_48 = mask_32;
    mask_48[4] = 0xFF;
    mask_48[5] = 0xFF;
    tree.insert(key_48, mask_48, 2).unwrap();

    let mut covered_by_48 = key_48;
    covered_by_48[15] = 0x01;
    assert_eq!(tree.find(covered_by_48), 2);

    let mut covered_by_32_only = key_32;
    covered_by_32_only[4] = 0x99;
    assert_eq!(tree.find(covered_by_32_only), 1);

    let mut uncovered = key_32;
    uncovered[0] = 0x30;
    assert_eq!(tree.find(uncovered), NO_VALUE);
}

#[test]
fn a_pool_can_back_more_than_one_tree() {
    let pool = Pool::create(4096).unwrap();
    let mut ipv4: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::None).unwrap();
    let mut ipv6: Ipv6RadixTree = Ipv6RadixTree::create(&pool, Preallocate::None).unwrap();

    ipv4.insert(0, 0xFFFF_FFFF, 7).unwrap();
    ipv6.insert([0; 16], [0xFF; 16], 9).unwrap();

    assert_eq!(ipv4.find(0), 7);
    assert_eq!(ipv6.find([0; 16]), 9);
}
