//! Shared fixture builder for the integration tests: a 4-section image
//! (directory + a 3-section hash-chained partition) matching the
//! on-disk layout `igfs::fs::Filesystem` expects.
//!
//! [`build_valid_image`] assembles a fully self-consistent image once;
//! the tamper helpers below it then patch specific bytes of a copy and
//! patch up only the CRC a given tamper is *not* meant to catch, so
//! each scenario isolates exactly one layer of the integrity pipeline.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

use igfs::structures::raw::directory::{FragmentDescriptor, PartitionDescriptor};
use igfs::structures::raw::hash_block::{HashExclude, HashHeader, SIGNATURE_SIZE};
use igfs::structures::raw::partition_header::{ExtentDescriptor, ExtentType, PartitionFlags, PartitionHeader};
use igfs::structures::raw::section_header::{SectionHeader, CRC_OFFSET, SECTION_MAGIC};
use igfs::structures::section::build_section;
use igfs_common::model::Model;
use igfs_common::strutil::FixedStr;

pub const SECTION_SIZE: usize = 4096;
pub const PARTITION_MINOR: u32 = 5;
pub const HASH_BYTES: usize = 32;

/// A throwaway 4096-bit RSA test key, generated once for these fixtures.
pub const TEST_RSA_KEY_PEM: &str = include_str!("test_rsa_key.pem");

/// Absolute byte offset, within section 1, of the hash block's stored
/// RSA signature.
pub const SECTION1_SIGNATURE_OFFSET: usize = SectionHeader::SIZE
    + PartitionHeader::SIZE
    + ExtentDescriptor::SIZE // one extent in the fixture partition
    + (HashHeader::SIZE - SIGNATURE_SIZE);

fn section_header(section_in_minor: u32, partition_minor: u32, next: u32) -> SectionHeader {
    SectionHeader {
        crc: 0,
        magic: SECTION_MAGIC,
        section_type: 0,
        section_size_exponent: SECTION_SIZE.trailing_zeros() as u8,
        partition_minor,
        generation: 1,
        section_in_minor,
        next_section: next,
    }
}

fn blake2b_digest(buf: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2bVar::new(HASH_BYTES).unwrap();
    Update::update(&mut hasher, buf);
    let mut out = vec![0u8; HASH_BYTES];
    hasher.finalize_variable(&mut out).unwrap();
    out
}

/// Mirrors `igfs::integrity`'s per-section masking: the three mandatory
/// exclude ranges always, plus (for the partition's first section) its
/// own signature and digest-table ranges.
fn section_digest(buf: &[u8], self_excludes: Option<(usize, usize)>) -> Vec<u8> {
    let mut masked = buf.to_vec();
    masked[0..4].fill(0);
    masked[16..18].fill(0);
    masked[22..26].fill(0);
    if let Some((values_start, values_len)) = self_excludes {
        masked[SECTION1_SIGNATURE_OFFSET..SECTION1_SIGNATURE_OFFSET + SIGNATURE_SIZE].fill(0);
        masked[values_start..values_start + values_len].fill(0);
    }
    blake2b_digest(&masked)
}

fn signed_message(excludes: &[HashExclude], hash_values: &[u8]) -> Vec<u8> {
    let mut message = Vec::new();
    message.push(HASH_BYTES as u8);
    message.extend_from_slice(&(excludes.len() as u32).to_le_bytes());
    message.extend_from_slice(&3u32.to_le_bytes());
    for exclude in excludes {
        message.extend_from_slice(&exclude.start.to_le_bytes());
        message.extend_from_slice(&exclude.end.to_le_bytes());
        message.extend_from_slice(&exclude.size.to_le_bytes());
    }
    message.extend_from_slice(hash_values);
    message
}

fn sign_hash_block(hash_values: &[u8]) -> [u8; SIGNATURE_SIZE] {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use sha2::Sha256;

    let private_key = rsa::RsaPrivateKey::from_pkcs1_pem(TEST_RSA_KEY_PEM).unwrap();
    let signing_key = SigningKey::<Sha256>::new(private_key);
    let message = signed_message(&[], hash_values);
    let signature = signing_key.sign(&message);
    let bytes = signature.to_bytes();
    let mut out = [0u8; SIGNATURE_SIZE];
    out[..bytes.len()].copy_from_slice(&bytes);
    out
}

pub fn trusted_public_key() -> rsa::RsaPublicKey {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    let private_key = rsa::RsaPrivateKey::from_pkcs1_pem(TEST_RSA_KEY_PEM).unwrap();
    rsa::RsaPublicKey::from(&private_key)
}

/// Builds a self-consistent 4-section image: section 0 is the
/// directory, sections 1-3 are partition [`PARTITION_MINOR`]'s
/// hash-chained sections. Every CRC, hash-chain digest and (if `sign`)
/// RSA signature is valid.
pub fn build_valid_image(sign: bool) -> Vec<u8> {
    let payload1 = b"squashfs-payload-one...........".to_vec();
    let payload2 = b"squashfs-payload-two...........".to_vec();
    let payload3 = b"squashfs-payload-three.........".to_vec();

    let partition_header = PartitionHeader {
        partition_type: 1,
        flags: PartitionFlags::HAS_HASH_BLOCK,
        partition_minor: PARTITION_MINOR,
        n_extents: 1,
        offset_blocktable: 0,
        partition_size: (SECTION_SIZE * 3) as u64,
        name: FixedStr::new_truncate("system"),
    };
    let extents = vec![ExtentDescriptor {
        extent_type: ExtentType::Squashfs,
        offset: 0,
        length: (payload1.len() + payload2.len() + payload3.len()) as u64,
        name: FixedStr::new_truncate("rootfs"),
    }];
    let excludes: Vec<HashExclude> = Vec::new();

    // Pass 1: build every section with a zeroed hash block, to compute
    // the digests over the actual on-disk bytes (the digest-table and
    // signature ranges are masked out of section 1's own digest, so
    // their placeholder content here doesn't matter).
    let hash_header_stub = HashHeader {
        hash_bytes: HASH_BYTES as u8,
        count_excludes: 0,
        count_hash: 3,
        signature: [0u8; SIGNATURE_SIZE],
    };
    let placeholder_values = vec![0u8; HASH_BYTES * 3];

    let section1_stub = build_section(
        &section_header(0, PARTITION_MINOR, 2),
        Some((&partition_header, &extents)),
        Some((&hash_header_stub, &excludes, &placeholder_values)),
        &payload1,
        SECTION_SIZE,
    )
    .unwrap();
    let section2 = build_section(&section_header(1, PARTITION_MINOR, 3), None, None, &payload2, SECTION_SIZE).unwrap();
    let section3 = build_section(
        &section_header(2, PARTITION_MINOR, 0xFFFF_FFFF),
        None,
        None,
        &payload3,
        SECTION_SIZE,
    )
    .unwrap();

    let digest0 = section_digest(&section1_stub, Some((SECTION1_SIGNATURE_OFFSET + SIGNATURE_SIZE, HASH_BYTES * 3)));
    let digest1 = section_digest(&section2, None);
    let digest2 = section_digest(&section3, None);

    let mut hash_values = Vec::with_capacity(HASH_BYTES * 3);
    hash_values.extend_from_slice(&digest0);
    hash_values.extend_from_slice(&digest1);
    hash_values.extend_from_slice(&digest2);

    let signature = if sign {
        sign_hash_block(&hash_values)
    } else {
        [0u8; SIGNATURE_SIZE]
    };
    let hash_header = HashHeader {
        hash_bytes: HASH_BYTES as u8,
        count_excludes: 0,
        count_hash: 3,
        signature,
    };

    // Pass 2: rebuild section 1 with the real digests and signature.
    let section1 = build_section(
        &section_header(0, PARTITION_MINOR, 2),
        Some((&partition_header, &extents)),
        Some((&hash_header, &excludes, &hash_values)),
        &payload1,
        SECTION_SIZE,
    )
    .unwrap();

    let mut directory_payload = Vec::new();
    directory_payload.extend_from_slice(&1u32.to_le_bytes());
    directory_payload.extend_from_slice(&1u32.to_le_bytes());
    let descriptor = PartitionDescriptor {
        minor: PARTITION_MINOR,
        first_fragment: 0,
        flags: 0,
    };
    let mut bytes = [0u8; PartitionDescriptor::SIZE];
    descriptor.serialize(&mut bytes).unwrap();
    directory_payload.extend_from_slice(&bytes);
    let fragment = FragmentDescriptor {
        first_section: 1,
        length: 3,
    };
    let mut bytes = [0u8; FragmentDescriptor::SIZE];
    fragment.serialize(&mut bytes).unwrap();
    directory_payload.extend_from_slice(&bytes);

    let section0 = build_section(&section_header(0, 0, 0xFFFF_FFFF), None, None, &directory_payload, SECTION_SIZE).unwrap();

    let mut image = Vec::with_capacity(SECTION_SIZE * 4);
    image.extend_from_slice(&section0);
    image.extend_from_slice(&section1);
    image.extend_from_slice(&section2);
    image.extend_from_slice(&section3);
    image
}

fn recompute_crc(section: &mut [u8]) {
    let crc = igfs_common::crc::SectionCrc32::checksum(&section[CRC_OFFSET..]);
    section[0..4].copy_from_slice(&crc.to_le_bytes());
}

/// Flips a payload byte in section 2 (the image's third section) and
/// leaves the stored CRC stale, so CRC32 verification is the first
/// thing to catch it.
pub fn flip_payload_byte_leave_crc_stale(image: &mut [u8]) {
    let section2 = &mut image[SECTION_SIZE * 2..SECTION_SIZE * 3];
    section2[SectionHeader::SIZE] ^= 0xFF;
}

/// Flips the same payload byte but recomputes the CRC afterward, so
/// only the BLAKE2b hash chain can catch it.
pub fn flip_payload_byte_fixup_crc(image: &mut [u8]) {
    let section2 = &mut image[SECTION_SIZE * 2..SECTION_SIZE * 3];
    section2[SectionHeader::SIZE] ^= 0xFF;
    recompute_crc(section2);
}

/// Flips a byte of section 1's stored RSA signature and recomputes its
/// CRC, so the hash chain still matches but the signature does not.
pub fn flip_signature_byte(image: &mut [u8]) {
    let section1 = &mut image[SECTION_SIZE..SECTION_SIZE * 2];
    section1[SECTION1_SIGNATURE_OFFSET] ^= 0xFF;
    recompute_crc(section1);
}

/// Points section 2's `next_section` back at section 1, turning the
/// chain into a cycle, and recomputes its CRC.
pub fn break_chain_into_cycle(image: &mut [u8]) {
    let section2 = &mut image[SECTION_SIZE * 2..SECTION_SIZE * 3];
    let next_offset = SectionHeader::FIELDS
        .iter()
        .find(|f| f.name == "next_section")
        .unwrap()
        .offset;
    section2[next_offset..next_offset + 4].copy_from_slice(&1u32.to_le_bytes());
    recompute_crc(section2);
}
