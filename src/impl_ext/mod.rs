// Crate-internal.
// ---

pub(crate) mod standard_resolvers {
    pub(crate) mod always_continue;
    pub(crate) mod retry_then_continue;
}

pub(crate) mod standard_mirrors {
    pub(crate) mod directory_mirror;
}

pub(crate) mod standard_distances {
    pub(crate) mod distance_table;
}

// Public exports.
// ---

pub mod exports {
    // This mod represents how clients see the library, and can differ from the
    // internal structure.
    //
    // The contents of this mod are re-exported in the root of the crate.

    pub mod standard_resolvers {
        pub use crate::impl_ext::standard_resolvers::always_continue::*;
        pub use crate::impl_ext::standard_resolvers::retry_then_continue::*;
    }

    pub mod standard_mirrors {
        pub use crate::impl_ext::standard_mirrors::directory_mirror::*;
    }

    pub mod standard_distances {
        pub use crate::impl_ext::standard_distances::distance_table::*;
    }
}
