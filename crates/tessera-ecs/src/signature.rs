use std::fmt;

/// Identifier assigned to a component type at registration. Doubles as its signature bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// The bit position of this component in a [`Signature`].
    pub fn index(self) -> u32 {
        self.0
    }
}

const WORD_BITS: u32 = u64::BITS;

/// A bit set with one bit per registered component type.
///
/// Used both for what an entity has and for what a system requires. Storage
/// grows to the highest bit set; equality only considers set bits, so two
/// signatures with different backing lengths can still be equal.
#[derive(Clone, Default)]
pub struct Signature {
    words: Vec<u64>,
}

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature { words: Vec::new() };

    /// An empty signature.
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// A signature with exactly the given component bits set.
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        let mut signature = Self::new();
        for id in ids {
            signature.set(id);
        }
        signature
    }

    pub fn set(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    pub fn clear(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1u64 << bit);
        }
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, bit) = Self::locate(id);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Whether every bit in `required` is also set in `self`.
    ///
    /// This is the system membership test: an entity matches a system when its
    /// signature is a superset of the system's required signature.
    pub fn is_superset_of(&self, required: &Signature) -> bool {
        required.words.iter().enumerate().all(|(i, &need)| {
            let have = self.words.get(i).copied().unwrap_or(0);
            have & need == need
        })
    }

    /// Union of both signatures.
    pub fn union(&self, other: &Signature) -> Signature {
        let len = self.words.len().max(other.words.len());
        let words = (0..len)
            .map(|i| {
                self.words.get(i).copied().unwrap_or(0) | other.words.get(i).copied().unwrap_or(0)
            })
            .collect();
        Signature { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of bits set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Reset to the empty signature, keeping the allocation.
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Iterate over the set component ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| ComponentId(i as u32 * WORD_BITS + bit))
        })
    }

    fn locate(id: ComponentId) -> (usize, u32) {
        ((id.0 / WORD_BITS) as usize, id.0 % WORD_BITS)
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.is_superset_of(other) && other.is_superset_of(self)
    }
}

impl Eq for Signature {}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|id| id.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(bits: &[u32]) -> Signature {
        bits.iter().map(|&b| ComponentId(b)).collect()
    }

    #[test]
    fn set_clear_contains() {
        let mut s = Signature::new();
        assert!(s.is_empty());
        s.set(ComponentId(3));
        s.set(ComponentId(130));
        assert!(s.contains(ComponentId(3)));
        assert!(s.contains(ComponentId(130)));
        assert!(!s.contains(ComponentId(4)));
        assert_eq!(s.len(), 2);

        s.clear(ComponentId(130));
        assert!(!s.contains(ComponentId(130)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn clear_unset_high_bit_is_noop() {
        let mut s = sig(&[1]);
        s.clear(ComponentId(500));
        assert_eq!(s, sig(&[1]));
    }

    #[test]
    fn superset_semantics() {
        let required = sig(&[0, 2]);
        assert!(sig(&[0, 1, 2]).is_superset_of(&required));
        assert!(sig(&[0, 2]).is_superset_of(&required));
        // Overlap alone is not enough.
        assert!(!sig(&[0]).is_superset_of(&required));
        assert!(!sig(&[1, 3]).is_superset_of(&required));
        // Everything satisfies an empty requirement.
        assert!(Signature::new().is_superset_of(&Signature::new()));
        assert!(sig(&[5]).is_superset_of(&Signature::new()));
        // Requirement on a bit beyond the entity's backing words.
        assert!(!sig(&[0]).is_superset_of(&sig(&[200])));
    }

    #[test]
    fn equality_ignores_backing_length() {
        let mut a = sig(&[1, 100]);
        a.clear(ComponentId(100));
        assert_eq!(a, sig(&[1]));
        a.reset();
        assert_eq!(a, Signature::new());
    }

    #[test]
    fn union_and_iter() {
        let u = sig(&[1, 64]).union(&sig(&[2, 64, 65]));
        let ids: Vec<u32> = u.iter().map(ComponentId::index).collect();
        assert_eq!(ids, vec![1, 2, 64, 65]);
    }
}
