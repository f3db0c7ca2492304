//! Component type registry
//!
//! Host components are registered into a global catalog before any program
//! runs. Each interpreter clones an immutable snapshot of the catalog, so
//! lookups during evaluation take no locks.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{
    ComponentResult, NativeCallError, NativeCallResult, RegistryError, RegistryResult,
};
use crate::interpreter::ast::Literal;
use crate::interpreter::tree::{IntoVarState, VarState};
use crate::interpreter::value::{FromLiteral, ParamBundle};

/// A component implemented in the host language.
///
/// Methods are normally reached through the descriptor's dispatch table.
/// Types that are registered without one can answer calls dynamically by
/// overriding [`method_arity`](Self::method_arity) and
/// [`invoke`](Self::invoke).
pub trait NativeComponent: Any + Send + Sync + fmt::Debug {
    /// Number of arguments taken by a dynamically dispatched method, or
    /// `None` if the component has no such method.
    fn method_arity(&self, _method: &str) -> Option<usize> {
        None
    }

    /// Invoke a dynamically dispatched method.
    fn invoke(&self, _method: &str, _args: &[Literal]) -> NativeCallResult<VarState> {
        Err(NativeCallError::NoSuchMethod)
    }
}

/// Constructor: parameter bundle to component.
pub type ComponentFactory =
    Arc<dyn Fn(&ParamBundle) -> ComponentResult<Box<dyn NativeComponent>> + Send + Sync>;

type MethodInvoker =
    Arc<dyn Fn(&dyn NativeComponent, &[Literal]) -> NativeCallResult<VarState> + Send + Sync>;

/// A single entry of a dispatch table.
#[derive(Clone)]
pub struct MethodEntry {
    arity: usize,
    invoke: MethodInvoker,
}

impl MethodEntry {
    /// Number of arguments the method takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Call the method. The caller has already checked the arity.
    pub fn invoke(
        &self,
        component: &dyn NativeComponent,
        args: &[Literal],
    ) -> NativeCallResult<VarState> {
        (self.invoke)(component, args)
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Everything the interpreter knows about a registered component type.
#[derive(Clone)]
pub struct ComponentDescriptor {
    name: String,
    factory: ComponentFactory,
    methods: Option<HashMap<String, MethodEntry>>,
    params: Option<Vec<String>>,
}

impl ComponentDescriptor {
    /// Descriptor with only a constructor.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ParamBundle) -> ComponentResult<Box<dyn NativeComponent>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            methods: None,
            params: None,
        }
    }

    /// Restrict accepted override names.
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = Some(params.into_iter().map(Into::into).collect());
        self
    }

    /// Canonical type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted parameter names, if declared.
    pub fn params(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    /// Whether the descriptor declares `param`. Descriptors without a
    /// parameter list accept every name.
    pub fn accepts_param(&self, param: &str) -> bool {
        self.params
            .as_ref()
            .is_none_or(|params| params.iter().any(|p| p == param))
    }

    /// Dispatch table entry for `method`.
    pub fn method(&self, method: &str) -> Option<&MethodEntry> {
        self.methods.as_ref()?.get(method)
    }

    /// Whether a dispatch table was built at registration.
    pub fn has_dispatch_table(&self) -> bool {
        self.methods.is_some()
    }

    /// Run the constructor.
    pub fn construct(&self, params: &ParamBundle) -> ComponentResult<Arc<dyn NativeComponent>> {
        let component = (self.factory)(params)?;
        Ok(Arc::from(component))
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self
            .methods
            .as_ref()
            .map(|table| table.keys().collect())
            .unwrap_or_default();
        methods.sort();
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("params", &self.params)
            .finish()
    }
}

fn downcast<T: NativeComponent>(component: &dyn NativeComponent) -> NativeCallResult<&T> {
    (component as &dyn Any)
        .downcast_ref::<T>()
        .ok_or(NativeCallError::HandleType {
            expected: type_name::<T>(),
        })
}

fn argument<A: FromLiteral>(args: &[Literal], index: usize) -> NativeCallResult<A> {
    let literal = args.get(index).ok_or(NativeCallError::Argument {
        index,
        expected: A::TYPE_NAME,
        found: "nothing",
    })?;
    A::from_literal(literal).ok_or(NativeCallError::Argument {
        index,
        expected: A::TYPE_NAME,
        found: literal.type_name(),
    })
}

/// Builder for descriptors of a concrete component type, with a dispatch
/// table made of typed closures.
pub struct TypedComponent<T> {
    descriptor: ComponentDescriptor,
    methods: HashMap<String, MethodEntry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeComponent> TypedComponent<T> {
    /// Start a descriptor for `T`.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ParamBundle) -> ComponentResult<T> + Send + Sync + 'static,
    {
        let descriptor = ComponentDescriptor::new(name, move |params: &ParamBundle| {
            let component = factory(params)?;
            Ok(Box::new(component) as Box<dyn NativeComponent>)
        });
        Self {
            descriptor,
            methods: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Restrict accepted override names.
    pub fn params(mut self, params: &[&str]) -> Self {
        self.descriptor = self.descriptor.with_params(params.iter().copied());
        self
    }

    fn entry<F>(mut self, name: &str, arity: usize, invoke: F) -> Self
    where
        F: Fn(&dyn NativeComponent, &[Literal]) -> NativeCallResult<VarState>
            + Send
            + Sync
            + 'static,
    {
        let invoke: MethodInvoker = Arc::new(invoke);
        self.methods
            .insert(name.to_string(), MethodEntry { arity, invoke });
        self
    }

    /// Add a method taking no arguments.
    pub fn method0<O, F>(self, name: &str, method: F) -> Self
    where
        O: IntoVarState,
        F: Fn(&T) -> ComponentResult<O> + Send + Sync + 'static,
    {
        self.entry(name, 0, move |component, _args| {
            let this = downcast::<T>(component)?;
            Ok(method(this)?.into_var_state())
        })
    }

    /// Add a method taking one argument.
    pub fn method1<A, O, F>(self, name: &str, method: F) -> Self
    where
        A: FromLiteral,
        O: IntoVarState,
        F: Fn(&T, A) -> ComponentResult<O> + Send + Sync + 'static,
    {
        self.entry(name, 1, move |component, args| {
            let this = downcast::<T>(component)?;
            let a = argument::<A>(args, 0)?;
            Ok(method(this, a)?.into_var_state())
        })
    }

    /// Add a method taking two arguments.
    pub fn method2<A, B, O, F>(self, name: &str, method: F) -> Self
    where
        A: FromLiteral,
        B: FromLiteral,
        O: IntoVarState,
        F: Fn(&T, A, B) -> ComponentResult<O> + Send + Sync + 'static,
    {
        self.entry(name, 2, move |component, args| {
            let this = downcast::<T>(component)?;
            let a = argument::<A>(args, 0)?;
            let b = argument::<B>(args, 1)?;
            Ok(method(this, a, b)?.into_var_state())
        })
    }

    /// Finish the descriptor.
    pub fn build(self) -> ComponentDescriptor {
        let mut descriptor = self.descriptor;
        descriptor.methods = Some(self.methods);
        descriptor
    }
}

#[derive(Default)]
struct CatalogState {
    types: HashMap<String, Arc<ComponentDescriptor>>,
    frozen: bool,
}

/// Mutable catalog of component types, used during the registration phase.
pub struct ComponentCatalog {
    state: RwLock<CatalogState>,
}

static CATALOG: Lazy<ComponentCatalog> = Lazy::new(|| {
    ComponentCatalog::with_defaults().expect("default component names are unique")
});

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Catalog holding the default component set.
    pub fn with_defaults() -> RegistryResult<Self> {
        let catalog = Self::new();
        crate::components::register_defaults(&catalog)?;
        Ok(catalog)
    }

    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a component type with a constructor and no dispatch table.
    pub fn register<F>(&self, name: &str, factory: F) -> RegistryResult<()>
    where
        F: Fn(&ParamBundle) -> ComponentResult<Box<dyn NativeComponent>> + Send + Sync + 'static,
    {
        self.register_descriptor(ComponentDescriptor::new(name, factory))
    }

    /// Register a typed component together with its dispatch table.
    pub fn register_typed<T: NativeComponent>(
        &self,
        component: TypedComponent<T>,
    ) -> RegistryResult<()> {
        self.register_descriptor(component.build())
    }

    /// Register a prepared descriptor. Names are unique; a rejected
    /// registration leaves the catalog unchanged.
    pub fn register_descriptor(&self, descriptor: ComponentDescriptor) -> RegistryResult<()> {
        let mut state = self.state.write();
        let name = descriptor.name().to_string();
        if state.frozen {
            return Err(RegistryError::Frozen(name));
        }
        if state.types.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        debug!(
            component = %name,
            dispatch_table = descriptor.has_dispatch_table(),
            "registered component type"
        );
        state.types.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Reject all further registration.
    pub fn freeze(&self) {
        let mut state = self.state.write();
        if !state.frozen {
            info!(types = state.types.len(), "component catalog frozen");
            state.frozen = true;
        }
    }

    /// Whether the catalog has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.state.read().frozen
    }

    /// Produce an immutable snapshot for an interpreter.
    pub fn snapshot(&self) -> ComponentRegistry {
        let state = self.state.read();
        ComponentRegistry {
            types: Arc::new(state.types.clone()),
        }
    }
}

/// Immutable view of the catalog used during evaluation.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    types: Arc<HashMap<String, Arc<ComponentDescriptor>>>,
}

impl ComponentRegistry {
    /// Descriptor registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.types.get(name)
    }

    /// Check whether the snapshot contains the specified type.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}

/// A constructed host component bound in the environment.
#[derive(Clone)]
pub struct NativeHandle {
    id: Uuid,
    descriptor: Arc<ComponentDescriptor>,
    component: Arc<dyn NativeComponent>,
}

impl NativeHandle {
    /// Construct a component from its descriptor.
    pub fn construct(
        descriptor: Arc<ComponentDescriptor>,
        params: &ParamBundle,
    ) -> ComponentResult<Self> {
        let component = descriptor.construct(params)?;
        Ok(Self {
            id: Uuid::new_v4(),
            descriptor,
            component,
        })
    }

    /// Unique handle id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Component type name.
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Descriptor the handle was built from.
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    /// The host component.
    pub fn component(&self) -> &dyn NativeComponent {
        self.component.as_ref()
    }

    /// Borrow the host component as its concrete type.
    pub fn downcast_ref<T: NativeComponent>(&self) -> Option<&T> {
        (self.component.as_ref() as &dyn Any).downcast_ref::<T>()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .field("component", &self.component)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcomes;

    #[derive(Debug, Default)]
    struct Counter {
        start: i64,
    }

    impl NativeComponent for Counter {}

    fn counter() -> TypedComponent<Counter> {
        TypedComponent::new("Counter", |params: &ParamBundle| {
            Ok(Counter {
                start: params.int("Start")?.unwrap_or(0),
            })
        })
        .params(&["Start"])
        .method0("Current", |c: &Counter| Ok(Outcomes::deterministic(c.start)))
        .method1("Plus", |c: &Counter, n: i64| {
            Ok(Outcomes::deterministic(c.start + n))
        })
        .method2("Within", |c: &Counter, lo: i64, hi: i64| {
            Ok(Outcomes::deterministic((lo..=hi).contains(&c.start)))
        })
    }

    #[test]
    fn duplicate_registration_leaves_catalog_unchanged() {
        let catalog = ComponentCatalog::new();
        catalog.register_typed(counter()).unwrap();
        let before = catalog.snapshot().list_types();

        let err = catalog
            .register("Counter", |_params| Ok(Box::new(Counter::default())))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("Counter".into()));

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.list_types(), before);
        let descriptor = snapshot.lookup("Counter").unwrap();
        assert!(descriptor.has_dispatch_table());
    }

    #[test]
    fn default_catalog_holds_builtin_types() {
        let catalog = ComponentCatalog::with_defaults().unwrap();
        assert_eq!(catalog.snapshot().list_types(), vec!["Cache", "Disk"]);
        assert!(!catalog.is_frozen());
    }

    #[test]
    fn frozen_catalog_rejects_registration() {
        let catalog = ComponentCatalog::new();
        catalog.freeze();
        let err = catalog.register_typed(counter()).unwrap_err();
        assert_eq!(err, RegistryError::Frozen("Counter".into()));
        assert!(!catalog.snapshot().has_type("Counter"));
    }

    #[test]
    fn snapshot_is_isolated_from_later_registration() {
        let catalog = ComponentCatalog::new();
        let early = catalog.snapshot();
        catalog.register_typed(counter()).unwrap();
        assert!(!early.has_type("Counter"));
        assert!(catalog.snapshot().has_type("Counter"));
    }

    #[test]
    fn typed_method_converts_arguments() {
        let descriptor = Arc::new(counter().build());
        let handle = NativeHandle::construct(
            descriptor.clone(),
            &ParamBundle::new().with("Start", Literal::Int(40)),
        )
        .unwrap();

        let plus = descriptor.method("Plus").unwrap();
        assert_eq!(plus.arity(), 1);
        let state = plus.invoke(handle.component(), &[Literal::Int(2)]).unwrap();
        assert_eq!(state, Outcomes::deterministic(42_i64).into_var_state());

        let err = plus
            .invoke(handle.component(), &[Literal::Bool(true)])
            .unwrap_err();
        assert!(matches!(
            err,
            NativeCallError::Argument { index: 0, expected: "int", found: "bool" }
        ));

        let within = descriptor.method("Within").unwrap();
        assert_eq!(within.arity(), 2);
        let state = within
            .invoke(handle.component(), &[Literal::Int(0), Literal::Int(50)])
            .unwrap();
        assert_eq!(state, Outcomes::deterministic(true).into_var_state());
        let err = within
            .invoke(handle.component(), &[Literal::Int(0)])
            .unwrap_err();
        assert!(matches!(
            err,
            NativeCallError::Argument { index: 1, found: "nothing", .. }
        ));
    }

    #[test]
    fn descriptor_param_list_is_enforced() {
        let descriptor = counter().build();
        assert!(descriptor.accepts_param("Start"));
        assert!(!descriptor.accepts_param("Stop"));

        let open = ComponentDescriptor::new("Open", |_params| Ok(Box::new(Counter::default())));
        assert!(open.accepts_param("anything"));
    }

    #[test]
    fn handle_downcasts_to_concrete_type() {
        let handle = NativeHandle::construct(Arc::new(counter().build()), &ParamBundle::new())
            .unwrap();
        assert_eq!(handle.downcast_ref::<Counter>().map(|c| c.start), Some(0));
        assert_eq!(handle.type_name(), "Counter");
    }
}
