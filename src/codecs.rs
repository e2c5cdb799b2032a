//! Small codec helpers shared across modules. `impl_bitfield_specifier_codecs!`
//! wires a `modular_bitfield::Specifier`-derived closed tag enum (such as
//! `FieldType` or `TrackType`) up to `declio`'s `Decode`/`Encode`/
//! `EncodedSize` traits, exactly as the teacher does for `PdbVersion` and
//! `PdbFeature`.

#[macro_export]
macro_rules! impl_bitfield_specifier_codecs {
    ($ty:ty) => {
        impl<Ctx> ::declio::Decode<Ctx> for $ty {
            fn decode<R>(_ctx: Ctx, reader: &mut R) -> Result<Self, ::declio::Error>
            where
                R: ::std::io::Read,
            {
                let val = ::declio::Decode::decode($crate::constants::ENDIANESS, reader)?;
                <$ty as ::modular_bitfield::Specifier>::from_bytes(val).map_err(::declio::Error::new)
            }
        }

        impl<Ctx> ::declio::Encode<Ctx> for $ty {
            fn encode<W>(&self, _ctx: Ctx, writer: &mut W) -> Result<(), ::declio::Error>
            where
                W: ::std::io::Write,
            {
                <$ty as ::modular_bitfield::Specifier>::into_bytes(*self)
                    .map_err(::declio::Error::new)?
                    .encode($crate::constants::ENDIANESS, writer)
            }
        }

        impl<Ctx> ::declio::EncodedSize<Ctx> for $ty {
            #[inline]
            fn encoded_size(&self, _ctx: Ctx) -> usize {
                ::std::mem::size_of::<<$ty as ::modular_bitfield::Specifier>::Bytes>()
            }
        }
    };
}
