use std::fmt;

use super::account::AccountId;
use super::error::DomainError;

/// Index of a log partition, always below the configured partition count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(u32);

impl PartitionId {
    pub fn new(partition: u32, partitions: u32) -> Result<Self, DomainError> {
        if partition >= partitions {
            return Err(DomainError::PartitionOutOfRange {
                partition,
                partitions,
            });
        }
        Ok(Self(partition))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checkpoint: next unread position within a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionOffset {
    pub partition: PartitionId,
    pub offset: u64,
}

impl PartitionOffset {
    pub fn new(partition: PartitionId, offset: u64) -> Self {
        Self { partition, offset }
    }
}

/// Maps account ids onto a fixed number of partitions.
///
/// Routing hashes the decimal key with murmur2 (seed `0x9747b28c`), the
/// same function a Kafka producer applies to keyed records, so an id always
/// lands on the same partition for a given partition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    partitions: u32,
}

impl Partitioner {
    pub fn new(partitions: u32) -> Result<Self, DomainError> {
        if partitions == 0 {
            return Err(DomainError::NoPartitions);
        }
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn partition_for(&self, id: AccountId) -> PartitionId {
        self.partition_for_key(id.key().as_bytes())
    }

    pub fn partition_for_key(&self, key: &[u8]) -> PartitionId {
        PartitionId((murmur2(key) & 0x7fff_ffff) % self.partitions)
    }

    /// Every partition index, in order
    pub fn all(&self) -> impl Iterator<Item = PartitionId> + use<> {
        (0..self.partitions).map(PartitionId)
    }
}

fn murmur2(data: &[u8]) -> u32 {
    const SEED: u32 = 0x9747_b28c;
    const M: u32 = 0x5bd1_e995;
    const R: u32 = 24;

    let mut h = SEED ^ data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(raw: i64) -> AccountId {
        AccountId::new(raw).unwrap()
    }

    #[test]
    fn murmur2_matches_reference_vectors() {
        assert_eq!(murmur2(b"21") as i32, -973_932_308);
        assert_eq!(murmur2(b"foobar") as i32, -790_332_482);
    }

    #[test]
    fn known_ids_route_to_fixed_partitions() {
        let partitioner = Partitioner::new(5).unwrap();
        assert_eq!(partitioner.partition_for(id(47)).get(), 3);
        assert_eq!(partitioner.partition_for(id(0)).get(), 1);
        assert_eq!(partitioner.partition_for(id(1)).get(), 4);
        assert_eq!(partitioner.partition_for(id(2)).get(), 3);
    }

    #[test]
    fn zero_partitions_rejected() {
        assert_eq!(Partitioner::new(0), Err(DomainError::NoPartitions));
    }

    #[test]
    fn partition_id_bounds_checked() {
        assert!(PartitionId::new(4, 5).is_ok());
        assert_eq!(
            PartitionId::new(5, 5),
            Err(DomainError::PartitionOutOfRange {
                partition: 5,
                partitions: 5
            })
        );
    }

    #[test]
    fn all_lists_every_partition() {
        let partitioner = Partitioner::new(3).unwrap();
        let ids: Vec<u32> = partitioner.all().map(|p| p.get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn ids_spread_over_every_partition() {
        let partitioner = Partitioner::new(5).unwrap();
        let mut seen = [false; 5];
        for raw in 0..200 {
            seen[partitioner.partition_for(id(raw)).index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    proptest! {
        #[test]
        fn routing_is_stable(raw in 0..=i32::MAX as i64, partitions in 1u32..64) {
            let first = Partitioner::new(partitions).unwrap();
            let second = Partitioner::new(partitions).unwrap();
            let a = first.partition_for(id(raw));
            prop_assert_eq!(a, first.partition_for(id(raw)));
            prop_assert_eq!(a, second.partition_for(id(raw)));
            prop_assert!(a.get() < partitions);
        }
    }
}
