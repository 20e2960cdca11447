//! Opaque handles into the solver's internal vectors.
//!
//! Constraints and soft bodies used to hold raw pointers into the particle
//! vector in the source this was distilled from, which breaks the moment the
//! vector reallocates during spawning. Indices sidestep that: they stay valid
//! across `Vec::push`, and the solver is the only thing that ever
//! dereferences them.

macro_rules! index_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_id!(ParticleId);
index_id!(ConstraintId);
index_id!(SpringId);
index_id!(SoftBodyId);
index_id!(BodyId);
