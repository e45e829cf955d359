use std::collections::BTreeSet;

use crate::foundation::ids::ObjIdx;
use crate::instance::InstanceAlgebra;
use crate::resolve::graph::ObjectGraph;
use crate::scene::options::ResolveOptions;

/// Side channel filled while resolving.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    /// First object found on the resolution stack twice.
    pub(crate) circular: Option<String>,
    /// Objects resolved during this call.
    pub(crate) resolved_now: BTreeSet<ObjIdx>,
    /// Total object resolutions, recursive ones included.
    pub(crate) resolutions: usize,
}

/// Mutable view the object resolver, reference lookup and conflict sweep share.
pub(crate) struct ResolveCtx<'a> {
    pub(crate) graph: &'a mut ObjectGraph,
    pub(crate) algebra: &'a mut InstanceAlgebra,
    pub(crate) options: &'a ResolveOptions,
    pub(crate) diagnostics: &'a mut Diagnostics,
}
