//! Typed wrappers at the API boundary
//!
//! `Callable<Args>` is implemented for every `Fn(A1..An) -> R` with
//! marshalable types, n = 0..=8. It lowers the closure into an
//! `ErasedCallable` and lifts an erased `Proxy` back into a closure with the
//! same parameter list.

use super::Proxy;
use crate::errors::{Error, Result, Site};
use crate::interop::{CallableSignature, ErasedCallable, Marshal, Value};
use std::sync::Arc;

/// A closure whose signature can be derived from its types
///
/// `Args` is the parameter tuple; it only disambiguates the arity.
pub trait Callable<Args>: Send + Sync + 'static {
    type Output: Marshal;

    /// Closure type handed back by `forwarding_wrap` and `memoize`
    type Proxy: Clone + Send + Sync;

    /// Signature derived from the parameter and return types
    fn signature() -> CallableSignature;

    /// Lower into erased form, encoding included
    fn erase(self) -> ErasedCallable;

    /// Lift an erased proxy back to the typed calling convention
    fn lift(proxy: Proxy) -> Self::Proxy;
}

macro_rules! impl_callable {
    ($arity:expr; $($index:tt $ty:ident $var:ident),*) => {
        impl<Func, Ret, $($ty,)*> Callable<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Ret + Send + Sync + 'static,
            Ret: Marshal + 'static,
            $($ty: Marshal + 'static,)*
        {
            type Output = Ret;
            type Proxy = Arc<dyn Fn($($ty),*) -> Result<Ret> + Send + Sync>;

            fn signature() -> CallableSignature {
                CallableSignature::new(vec![$(<$ty as Marshal>::kind()),*], Ret::kind())
            }

            #[allow(unused_mut, unused_variables)]
            fn erase(self) -> ErasedCallable {
                let encoding = <Self as Callable<($($ty,)*)>>::signature().encoding();
                ErasedCallable::from_raw(encoding, move |args: &[Value]| {
                    if args.len() != $arity {
                        return Err(Error::mismatch(Site::Arity, $arity, args.len()));
                    }
                    let mut args = args.iter().cloned();
                    $(
                        let $var = <$ty as Marshal>::from_value(args.next().unwrap_or_default())
                            .map_err(|e| e.at(Site::Argument($index)))?;
                    )*
                    Ok((self)($($var),*).into_value())
                })
            }

            fn lift(proxy: Proxy) -> Self::Proxy {
                Arc::new(move |$($var: $ty),*| {
                    let value = proxy.invoke(vec![$($var.into_value()),*])?;
                    Ret::from_value(value)
                })
            }
        }
    };
}

impl_callable!(0;);
impl_callable!(1; 0 A1 a1);
impl_callable!(2; 0 A1 a1, 1 A2 a2);
impl_callable!(3; 0 A1 a1, 1 A2 a2, 2 A3 a3);
impl_callable!(4; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4);
impl_callable!(5; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5);
impl_callable!(6; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6);
impl_callable!(7; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6, 6 A7 a7);
impl_callable!(8; 0 A1 a1, 1 A2 a2, 2 A3 a3, 3 A4 a4, 4 A5 a5, 5 A6 a6, 6 A7 a7, 7 A8 a8);
