//! Route registry and the frozen route table.
//!
//! Resource classes are registered into a [`RouteRegistry`] at startup.
//! Each registration is validated as a whole and either fully applied or
//! rejected. [`RouteRegistry::freeze`] runs the cross-class checks and
//! produces the immutable [`RouteTable`] that dispatch reads.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use meridian_router::{template, MediaType, RouteIndex, UriTemplate};
use serde::Serialize;

use crate::convert::{ConverterRegistry, ParamConverter};
use crate::error::RegistrationError;
use crate::model::{BeanRegistry, BeanSpec, ParamSource, ParameterSpec};
use crate::resource::{Invoker, Lifecycle, MethodKind, ResourceClass, ResourceMethod};

/// Summary of one successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    /// The class name.
    pub class: String,
    /// Number of verb methods.
    pub methods: usize,
    /// Number of sub-resource locators.
    pub locators: usize,
}

/// A registered class.
pub(crate) struct ClassEntry {
    pub(crate) name: String,
    pub(crate) lifecycle: Option<Lifecycle>,
    pub(crate) root: bool,
    pub(crate) methods: Vec<usize>,
}

/// Collects resource classes, beans and converters before dispatch starts.
///
/// # Example
///
/// ```
/// use meridian_core::{Entity, Operation, ResourceClass, ResourceResponse, RouteRegistry};
/// use std::sync::Arc;
///
/// struct Health;
///
/// let mut registry = RouteRegistry::new();
/// let result = registry
///     .register(
///         ResourceClass::new("/health")
///             .singleton(Arc::new(Health))
///             .operation(Operation::get("").handle(|_: Arc<Health>, _, _| async {
///                 Ok(ResourceResponse::ok(Entity::text("ok")))
///             })),
///     )
///     .unwrap();
/// assert_eq!(result.methods, 1);
///
/// let table = registry.freeze().unwrap();
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Default)]
pub struct RouteRegistry {
    classes: Vec<ClassEntry>,
    methods: Vec<Arc<ResourceMethod>>,
    sub_resources: HashMap<TypeId, usize>,
    beans: BeanRegistry,
    converters: ConverterRegistry,
}

impl RouteRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a root resource class.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if any operation is invalid or the
    /// class has no lifecycle. Nothing is registered on error.
    pub fn register<R: Send + Sync + 'static>(
        &mut self,
        class: ResourceClass<R>,
    ) -> Result<RegistrationResult, RegistrationError> {
        if class.lifecycle.is_none() {
            return Err(RegistrationError::MissingLifecycle { class: class.name });
        }
        self.add_class(class, true)
    }

    /// Registers a class whose instances are returned by locators.
    ///
    /// Its templates are relative to whatever the locator left unmatched.
    /// A lifecycle is not needed. Registering the same type again replaces
    /// the earlier class as locator target.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if any operation is invalid.
    pub fn register_sub_resource<R: Send + Sync + 'static>(
        &mut self,
        class: ResourceClass<R>,
    ) -> Result<RegistrationResult, RegistrationError> {
        let result = self.add_class(class, false)?;
        self.sub_resources
            .insert(TypeId::of::<R>(), self.classes.len() - 1);
        Ok(result)
    }

    /// Registers a bean.
    pub fn register_bean(&mut self, bean: BeanSpec) {
        tracing::debug!(bean = bean.name(), "registered bean");
        self.beans.register(bean);
    }

    /// Registers a converter for a custom parameter type.
    pub fn register_converter(
        &mut self,
        type_name: impl Into<String>,
        converter: impl ParamConverter,
    ) {
        self.converters.register(type_name, converter);
    }

    /// Registers a [`FromStr`] based converter for a custom parameter type.
    pub fn register_converter_from_str<T>(&mut self, type_name: impl Into<String>)
    where
        T: FromStr + Serialize + 'static,
        T::Err: fmt::Display,
    {
        self.converters.register_from_str::<T>(type_name);
    }

    fn add_class<R: Send + Sync + 'static>(
        &mut self,
        class: ResourceClass<R>,
        root: bool,
    ) -> Result<RegistrationResult, RegistrationError> {
        let class_index = self.classes.len();
        let mut built: Vec<ResourceMethod> = Vec::with_capacity(class.operations.len());
        let mut keys: Vec<(String, String)> = Vec::with_capacity(class.operations.len());

        for op in class.operations {
            let name = op.display_name();
            let kind = match (op.verb.clone(), op.locator) {
                (Some(verb), _) => MethodKind::Verb(verb),
                (None, Some(target)) => MethodKind::Locator(target),
                (None, None) => {
                    return Err(RegistrationError::MissingVerb {
                        class: class.name,
                        method: name,
                    })
                }
            };
            let Some(invoker) = op.invoker else {
                return Err(RegistrationError::MissingHandler {
                    class: class.name,
                    method: name,
                });
            };
            if matches!(
                (&kind, &invoker),
                (MethodKind::Verb(_), Invoker::Locator(_))
                    | (MethodKind::Locator(_), Invoker::Method(_))
            ) {
                return Err(RegistrationError::MissingHandler {
                    class: class.name,
                    method: name,
                });
            }

            let template = UriTemplate::parse(&template::concat(&class.base, &op.path))
                .map_err(|source| RegistrationError::Template {
                    class: class.name.clone(),
                    method: name.clone(),
                    source,
                })?;
            let consumes = parse_media(&op.consumes, &class.name, &name)?;
            let produces = parse_media(&op.produces, &class.name, &name)?;

            if op
                .params
                .iter()
                .filter(|p| p.source() == ParamSource::Body)
                .count()
                > 1
            {
                return Err(RegistrationError::MultipleBodies {
                    class: class.name,
                    method: name,
                });
            }
            if root {
                check_path_params(&op.params, &template, &class.name, &name)?;
            }

            let key = duplicate_key(&kind, &template, &consumes, &produces);
            if let Some((_, existing)) = keys.iter().find(|(k, _)| *k == key) {
                return Err(RegistrationError::DuplicateMethod {
                    class: class.name,
                    method: name,
                    existing: existing.clone(),
                    verb: match &kind {
                        MethodKind::Verb(verb) => verb.to_string(),
                        MethodKind::Locator(_) => "LOCATOR".to_string(),
                    },
                    path: template.as_str().to_string(),
                });
            }
            keys.push((key, name.clone()));

            built.push(ResourceMethod {
                id: self.methods.len() + built.len(),
                name,
                class: class_index,
                class_name: class.name.clone(),
                kind,
                template,
                consumes,
                produces,
                params: op.params,
                returns: op.returns,
                invoker,
            });
        }

        let locators = built.iter().filter(|m| m.is_locator()).count();
        let result = RegistrationResult {
            class: class.name.clone(),
            methods: built.len() - locators,
            locators,
        };
        let ids: Vec<usize> = built.iter().map(ResourceMethod::id).collect();
        for method in built {
            tracing::debug!(
                class = %method.class_name,
                method = %method.name,
                template = %method.template,
                "registered resource method"
            );
            self.methods.push(Arc::new(method));
        }
        self.classes.push(ClassEntry {
            name: class.name,
            lifecycle: class.lifecycle,
            root,
            methods: ids,
        });
        Ok(result)
    }

    /// Runs the cross-class checks and produces the route table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when a locator targets an unregistered
    /// sub-resource, a bean is unknown or cyclic, or a custom type has no
    /// converter.
    pub fn freeze(self) -> Result<Arc<RouteTable>, RegistrationError> {
        for method in &self.methods {
            if let MethodKind::Locator(target) = &method.kind {
                if !self.sub_resources.contains_key(&target.id) {
                    return Err(RegistrationError::UnknownSubResource {
                        class: method.class_name.clone(),
                        method: method.name.clone(),
                        target: target.name.to_string(),
                    });
                }
            }
        }

        if let Some(cycle) = self.beans.find_cycle() {
            return Err(RegistrationError::CyclicBean { cycle });
        }
        let bean_members = self.beans.iter().flat_map(BeanSpec::members);
        let method_params = self.methods.iter().flat_map(|m| m.params.iter());
        for spec in method_params.chain(bean_members) {
            if let Some(bean) = spec.bean_name() {
                if self.beans.get(bean).is_none() {
                    return Err(RegistrationError::UnknownBean {
                        name: bean.to_string(),
                    });
                }
            }
            if let Some(type_name) = spec.target().converter_name() {
                if !self.converters.contains(type_name) {
                    return Err(RegistrationError::MissingConverter {
                        type_name: type_name.to_string(),
                    });
                }
            }
        }

        let mut index = RouteIndex::new();
        for class in self.classes.iter().filter(|c| c.root) {
            for &id in &class.methods {
                index.insert(self.methods[id].template.root_literal(), id);
            }
        }

        tracing::info!(
            classes = self.classes.len(),
            methods = self.methods.len(),
            indexed = index.len(),
            "route table frozen"
        );

        Ok(Arc::new(RouteTable {
            classes: self.classes,
            methods: self.methods,
            index,
            sub_resources: self.sub_resources,
            beans: self.beans,
            converters: self.converters,
        }))
    }
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

fn parse_media(
    declared: &[String],
    class: &str,
    method: &str,
) -> Result<Vec<MediaType>, RegistrationError> {
    if declared.is_empty() {
        return Ok(vec![MediaType::wildcard()]);
    }
    declared
        .iter()
        .map(|raw| {
            MediaType::parse(raw).map_err(|source| RegistrationError::MediaType {
                class: class.to_string(),
                method: method.to_string(),
                source,
            })
        })
        .collect()
}

fn check_path_params(
    params: &[ParameterSpec],
    template: &UriTemplate,
    class: &str,
    method: &str,
) -> Result<(), RegistrationError> {
    for spec in params.iter().filter(|p| p.source() == ParamSource::Path) {
        if !template.has_variable(spec.name()) {
            return Err(RegistrationError::UnknownPathParam {
                class: class.to_string(),
                method: method.to_string(),
                name: spec.name().to_string(),
            });
        }
    }
    Ok(())
}

fn duplicate_key(
    kind: &MethodKind,
    template: &UriTemplate,
    consumes: &[MediaType],
    produces: &[MediaType],
) -> String {
    let sorted = |types: &[MediaType]| {
        let mut essences: Vec<String> = types.iter().map(ToString::to_string).collect();
        essences.sort();
        essences.join(",")
    };
    let verb = match kind {
        MethodKind::Verb(verb) => verb.as_str(),
        MethodKind::Locator(_) => "LOCATOR",
    };
    format!(
        "{verb} {} [{}] [{}]",
        template.shape(),
        sorted(consumes),
        sorted(produces)
    )
}

/// The immutable result of registration, shared by every request.
pub struct RouteTable {
    pub(crate) classes: Vec<ClassEntry>,
    pub(crate) methods: Vec<Arc<ResourceMethod>>,
    pub(crate) index: RouteIndex,
    pub(crate) sub_resources: HashMap<TypeId, usize>,
    beans: BeanRegistry,
    converters: ConverterRegistry,
}

impl RouteTable {
    /// Number of resource methods, locators included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns true if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// A method by id.
    #[must_use]
    pub fn method(&self, id: usize) -> Option<&Arc<ResourceMethod>> {
        self.methods.get(id)
    }

    /// Every method in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<ResourceMethod>> {
        self.methods.iter()
    }

    /// The lifecycle of a class, if it has one.
    #[must_use]
    pub fn lifecycle(&self, class: usize) -> Option<&Lifecycle> {
        self.classes.get(class).and_then(|c| c.lifecycle.as_ref())
    }

    /// The name of a class.
    #[must_use]
    pub fn class_name(&self, class: usize) -> Option<&str> {
        self.classes.get(class).map(|c| c.name.as_str())
    }

    /// Registered beans.
    #[must_use]
    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    /// Registered converters.
    #[must_use]
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .field("sub_resources", &self.sub_resources.len())
            .field("beans", &self.beans)
            .field("converters", &self.converters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, TypeDescriptor};
    use crate::model::ParamType;
    use crate::resource::Operation;
    use crate::response::ResourceResponse;

    struct Books;
    struct Chapter;

    fn ok_op(op: Operation<Books>) -> Operation<Books> {
        op.handle(|_, _, _| async { Ok(ResourceResponse::ok(Entity::text("ok"))) })
    }

    fn books() -> ResourceClass<Books> {
        ResourceClass::new("/books").singleton(Arc::new(Books))
    }

    #[test]
    fn test_register_counts_methods_and_locators() {
        let mut registry = RouteRegistry::new();
        let class = books()
            .operation(ok_op(Operation::get("")))
            .operation(ok_op(Operation::post("")))
            .operation(Operation::locator("/{id}/chapters", |_: Arc<Books>, _, _| async {
                Ok(Arc::new(Chapter))
            }));
        let result = registry.register(class).unwrap();
        assert_eq!(result.class, "Books");
        assert_eq!(result.methods, 2);
        assert_eq!(result.locators, 1);
    }

    #[test]
    fn test_missing_verb() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(books().operation(ok_op(Operation::new("/x").named("orphan"))))
            .unwrap_err();
        assert!(matches!(
            error,
            RegistrationError::MissingVerb { ref method, .. } if method == "orphan"
        ));
    }

    #[test]
    fn test_missing_handler() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(books().operation(Operation::get("/x")))
            .unwrap_err();
        assert!(matches!(error, RegistrationError::MissingHandler { .. }));
    }

    #[test]
    fn test_duplicate_method_rejected_atomically() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(
                books()
                    .operation(ok_op(
                        Operation::get("/{id}").named("a").produces("application/json"),
                    ))
                    .operation(ok_op(
                        Operation::get("/{id}/").named("b").produces("application/json"),
                    )),
            )
            .unwrap_err();
        match error {
            RegistrationError::DuplicateMethod {
                method, existing, ..
            } => {
                assert_eq!(method, "b");
                assert_eq!(existing, "a");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(registry.freeze().unwrap().is_empty());
    }

    #[test]
    fn test_capture_names_do_not_distinguish_paths() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(
                books()
                    .operation(ok_op(Operation::get("/{a}").named("by_a")))
                    .operation(ok_op(Operation::get("/{b}").named("by_b"))),
            )
            .unwrap_err();
        assert!(matches!(
            error,
            RegistrationError::DuplicateMethod { ref method, ref existing, .. }
                if method == "by_b" && existing == "by_a"
        ));

        registry
            .register(
                books()
                    .operation(ok_op(Operation::get("/{a}").named("plain")))
                    .operation(ok_op(Operation::get(r"/{b:\d+}").named("digits"))),
            )
            .unwrap();
    }

    #[test]
    fn test_same_path_different_produces_is_fine() {
        let mut registry = RouteRegistry::new();
        registry
            .register(
                books()
                    .operation(ok_op(Operation::get("").produces("application/json")))
                    .operation(ok_op(Operation::get("").produces("text/plain"))),
            )
            .unwrap();
    }

    #[test]
    fn test_malformed_template() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(books().operation(ok_op(Operation::get("/{id"))))
            .unwrap_err();
        assert!(matches!(error, RegistrationError::Template { .. }));
    }

    #[test]
    fn test_invalid_media_type() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(books().operation(ok_op(Operation::get("").consumes("not a type"))))
            .unwrap_err();
        assert!(matches!(error, RegistrationError::MediaType { .. }));
    }

    #[test]
    fn test_multiple_bodies() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(
                books().operation(ok_op(
                    Operation::post("")
                        .param(ParameterSpec::body(TypeDescriptor::single("Book")))
                        .param(ParameterSpec::body(TypeDescriptor::single("Book"))),
                )),
            )
            .unwrap_err();
        assert!(matches!(error, RegistrationError::MultipleBodies { .. }));
    }

    #[test]
    fn test_unknown_path_param() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(books().operation(ok_op(
                Operation::get("/{id}").param(ParameterSpec::path("isbn", ParamType::String)),
            )))
            .unwrap_err();
        assert!(matches!(
            error,
            RegistrationError::UnknownPathParam { ref name, .. } if name == "isbn"
        ));
    }

    #[test]
    fn test_missing_lifecycle() {
        let mut registry = RouteRegistry::new();
        let error = registry
            .register(ResourceClass::<Books>::new("/books").operation(ok_op(Operation::get(""))))
            .unwrap_err();
        assert!(matches!(error, RegistrationError::MissingLifecycle { .. }));
    }

    #[test]
    fn test_freeze_rejects_unknown_sub_resource() {
        let mut registry = RouteRegistry::new();
        registry
            .register(books().operation(Operation::locator("/{id}", |_: Arc<Books>, _, _| async {
                Ok(Arc::new(Chapter))
            })))
            .unwrap();
        assert!(matches!(
            registry.freeze().unwrap_err(),
            RegistrationError::UnknownSubResource { .. }
        ));
    }

    #[test]
    fn test_freeze_checks_beans_and_converters() {
        let mut registry = RouteRegistry::new();
        let search = Operation::get("").param(ParameterSpec::bean("Search"));
        registry.register(books().operation(ok_op(search))).unwrap();
        assert!(matches!(
            registry.freeze().unwrap_err(),
            RegistrationError::UnknownBean { ref name } if name == "Search"
        ));

        let mut registry = RouteRegistry::new();
        registry.register_bean(
            BeanSpec::new("Search").member(ParameterSpec::query("isbn", ParamType::custom("Isbn"))),
        );
        assert!(matches!(
            registry.freeze().unwrap_err(),
            RegistrationError::MissingConverter { ref type_name } if type_name == "Isbn"
        ));

        let mut registry = RouteRegistry::new();
        registry.register_bean(
            BeanSpec::new("Search").member(ParameterSpec::query("isbn", ParamType::custom("Isbn"))),
        );
        registry.register_converter_from_str::<u64>("Isbn");
        assert!(registry.freeze().is_ok());
    }

    #[test]
    fn test_freeze_rejects_bean_cycle() {
        let mut registry = RouteRegistry::new();
        registry.register_bean(BeanSpec::new("A").member(ParameterSpec::bean("B")));
        registry.register_bean(BeanSpec::new("B").member(ParameterSpec::bean("A")));
        assert!(matches!(
            registry.freeze().unwrap_err(),
            RegistrationError::CyclicBean { .. }
        ));
    }
}
