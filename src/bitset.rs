// src/bitset.rs
//! Typed bit-set newtypes
//!
//! Refine flags, quirks and plugin capabilities are all small sets of
//! named bits. The `bitset!` macro generates a `Copy` newtype over an
//! integer with set operations, name lookup and a readable `Debug`.

macro_rules! bitset {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $repr:ty {
            $(
                $(#[$fmeta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name($repr);

        #[allow(dead_code)]
        impl $name {
            $(
                $(#[$fmeta])*
                pub const $flag: Self = Self($value);
            )*

            const NAMED: &'static [(&'static str, Self)] = &[$((stringify!($flag), Self($value))),*];

            /// The empty set
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Raw bit representation
            pub const fn bits(&self) -> $repr {
                self.0
            }

            /// Build from raw bits, keeping unknown bits
            pub const fn from_bits_retain(bits: $repr) -> Self {
                Self(bits)
            }

            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// True if every bit of `other` is set
            pub const fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// True if any bit of `other` is set
            pub const fn intersects(&self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Names of the set flags, in declaration order
            pub fn names(&self) -> Vec<&'static str> {
                Self::NAMED
                    .iter()
                    .filter(|(_, flag)| flag.0 != 0 && self.contains(*flag))
                    .map(|(name, _)| *name)
                    .collect()
            }

            /// Look up a flag by name, ignoring case and treating `-` as `_`
            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = name.trim().replace('-', "_").to_ascii_uppercase();
                Self::NAMED
                    .iter()
                    .find(|(flag_name, _)| *flag_name == wanted)
                    .map(|(_, flag)| *flag)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.insert(rhs);
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                self.difference(rhs)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let names = self.names();
                if names.is_empty() {
                    write!(f, "{}(empty)", stringify!($name))
                } else {
                    write!(f, "{}({})", stringify!($name), names.join(" | "))
                }
            }
        }
    };
}

pub(crate) use bitset;

#[cfg(test)]
mod tests {
    bitset! {
        struct Sample: u32 {
            const ALPHA = 1 << 0;
            const BETA = 1 << 1;
            const GAMMA_RAY = 1 << 4;
        }
    }

    #[test]
    fn test_set_operations() {
        let mut set = Sample::ALPHA | Sample::GAMMA_RAY;
        assert!(set.contains(Sample::ALPHA));
        assert!(!set.contains(Sample::ALPHA | Sample::BETA));
        assert!(set.intersects(Sample::ALPHA | Sample::BETA));

        set.remove(Sample::ALPHA);
        assert_eq!(set, Sample::GAMMA_RAY);
        assert_eq!((set - Sample::GAMMA_RAY), Sample::empty());
    }

    #[test]
    fn test_names_and_lookup() {
        let set = Sample::BETA | Sample::GAMMA_RAY;
        assert_eq!(set.names(), vec!["BETA", "GAMMA_RAY"]);
        assert_eq!(Sample::from_name("gamma-ray"), Some(Sample::GAMMA_RAY));
        assert_eq!(Sample::from_name("delta"), None);
        assert_eq!(format!("{:?}", Sample::empty()), "Sample(empty)");
    }
}
