//! Build an [`ApiGraph`] and [`Annotations`] from an [`ApiDocument`].
//!
//! Loading runs in passes so declarations may refer to each other in any
//! order:
//! 1. declare every named entity
//! 2. resolve type expressions, bases and responses
//! 3. record property, enum and union markers
//! 4. attach status-monitor options to polling locations
//! 5. resolve explicit polling and final operation links
//! 6. validate final-state overrides
//! 7. surface status-type findings for every lro-status marker
//!
//! Unknown names and duplicates are hard errors. Everything else is a
//! diagnostic returned alongside the loaded document.

use std::path::Path;

use indexmap::IndexMap;

use super::schema::{
    ApiDocument, FinalLocationDecl, LinkDecl, LocationDecl, OperationDecl, ParameterDecl,
    PollingLocationDecl, PropertyDecl, PropertyDetail,
};
use crate::annotations::{
    AnnotationStore, Annotations, LinkKind, MemberRef, OperationLinkMetadata, StatusTarget,
};
use crate::diagnostics::{Diagnosed, Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::error::{LrometaError, Result};
use crate::graph::{
    ApiGraph, HttpVerb, OperationId, PropertyId, PropertyLocation, Response, ShapeId, TypeGraph,
    TypeRef, UnionVariant,
};
use crate::lro::links::{ParameterMapping, resolve_operation_link};
use crate::lro::monitor::{ResultNames, extract_polling_location_info};
use crate::lro::states::{
    classify_property_states, find_lro_status_property, get_long_running_states,
};
use crate::lro::steps::{FinalStateValue, ResponseModel};
use crate::lro::{EngineOptions, LroEngine, validate_final_state};

/// A document turned into an analyzable snapshot
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub graph: ApiGraph,
    pub annotations: Annotations,
    /// Fingerprint of the source document
    pub fingerprint: String,
}

impl LoadedDocument {
    pub fn engine(&self, options: EngineOptions) -> LroEngine<'_, ApiGraph, Annotations> {
        LroEngine::with_options(&self.graph, &self.annotations, options)
    }
}

/// Read and load a document file
pub fn load_file(path: &Path, names: &ResultNames) -> Result<Diagnosed<LoadedDocument>> {
    let document = ApiDocument::from_path(path)?;
    load_document(&document, names)
}

pub fn load_document(
    document: &ApiDocument,
    names: &ResultNames,
) -> Result<Diagnosed<LoadedDocument>> {
    document.validate()?;
    let fingerprint = document.fingerprint()?;

    let mut loader = Loader {
        document,
        names,
        graph: ApiGraph::new(),
        annotations: Annotations::new(),
        collector: DiagnosticCollector::new(),
        shapes: Vec::new(),
        operations: Vec::new(),
    };
    loader.declare()?;
    loader.resolve()?;
    loader.mark()?;
    loader.attach_polling_locations()?;
    loader.link_operations()?;
    loader.final_state_overrides();
    loader.check_status_types();

    let Loader {
        graph,
        annotations,
        collector,
        ..
    } = loader;
    log::info!(
        "Loaded {} operations, {} diagnostics (fingerprint {})",
        graph.operations().len(),
        collector.len(),
        &fingerprint[..12]
    );
    Ok(collector.wrap(LoadedDocument {
        graph,
        annotations,
        fingerprint,
    }))
}

struct Loader<'d> {
    document: &'d ApiDocument,
    names: &'d ResultNames,
    graph: ApiGraph,
    annotations: Annotations,
    collector: DiagnosticCollector,
    /// Declared shapes in document order
    shapes: Vec<ShapeId>,
    operations: Vec<OperationId>,
}

/// Resolve a type expression: a quoted string literal,
/// `ResourceLocation<Shape>`, or a declared or built-in name
fn resolve_type_expr(graph: &mut ApiGraph, expr: &str) -> Result<TypeRef> {
    let expr = expr.trim();
    if let Some(literal) = expr
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return Ok(TypeRef::StringLiteral(literal.to_string()));
    }
    if let Some(inner) = expr
        .strip_prefix("ResourceLocation<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        let resource = graph
            .find_shape(inner.trim())
            .ok_or_else(|| LrometaError::UnknownType(inner.trim().to_string()))?;
        return Ok(TypeRef::Scalar(graph.resource_location_of(resource)));
    }
    graph.resolve_type(expr)
}

fn response_model(graph: &mut ApiGraph, expr: &str) -> Result<ResponseModel> {
    match resolve_type_expr(graph, expr)? {
        TypeRef::Shape(id) => Ok(ResponseModel::Shape(id)),
        ty if ty.is_void() => Ok(ResponseModel::Void),
        _ => Err(LrometaError::InvalidDocument(format!(
            "'{}' is neither a model nor void",
            expr
        ))),
    }
}

fn location(detail: &PropertyDetail, name: &str) -> PropertyLocation {
    match detail.location {
        LocationDecl::Payload => PropertyLocation::Payload,
        LocationDecl::Body => PropertyLocation::Body,
        LocationDecl::Header => PropertyLocation::Header {
            name: detail.header.clone().unwrap_or_else(|| name.to_string()),
        },
        LocationDecl::Path => PropertyLocation::Path,
        LocationDecl::Query => PropertyLocation::Query,
    }
}

/// `None` when a mapping does not name exactly one source
fn parameter_mapping(decl: &ParameterDecl) -> Option<ParameterMapping> {
    match (&decl.request_parameter, &decl.response_property) {
        (Some(name), None) => Some(ParameterMapping::RequestParameter(name.clone())),
        (None, Some(name)) => Some(ParameterMapping::ResponseProperty(name.clone())),
        _ => None,
    }
}

fn parameters_shape_name(op: &OperationDecl) -> String {
    match &op.interface {
        Some(interface) => format!("{}.{}.parameters", interface, op.name),
        None => format!("{}.parameters", op.name),
    }
}

impl Loader<'_> {
    //=== Pass 1: declarations ===

    fn declare(&mut self) -> Result<()> {
        for scalar in &self.document.scalars {
            let base = match &scalar.base {
                Some(base) => Some(
                    self.graph
                        .find_scalar(base)
                        .ok_or_else(|| LrometaError::UnknownType(base.clone()))?,
                ),
                None => None,
            };
            self.graph.add_scalar(&scalar.name, base)?;
        }

        for decl in &self.document.enums {
            let members: Vec<&str> = decl.members.iter().map(|m| m.name()).collect();
            let id = self.graph.add_enum(&decl.name, &members)?;
            for member in &decl.members {
                if let Some(value) = member.value() {
                    self.graph.set_member_value(id, member.name(), value);
                }
            }
        }

        for decl in &self.document.unions {
            self.graph.add_union(Some(decl.name.as_str()), Vec::new())?;
        }

        for decl in &self.document.shapes {
            let id = self.graph.add_shape(&decl.name)?;
            let namespace = decl.namespace.as_ref().or(self.document.namespace.as_ref());
            if let Some(namespace) = namespace {
                self.graph.set_namespace(id, namespace);
            }
            if let Some(template) = &decl.template {
                self.graph.set_template(id, template);
            }
            self.shapes.push(id);
        }

        for decl in &self.document.operations {
            let id = self.graph.add_operation_in(
                decl.interface.as_deref(),
                &decl.name,
                decl.verb,
                &decl.path,
            )?;
            self.operations.push(id);
        }
        Ok(())
    }

    //=== Pass 2: resolution ===

    fn resolve(&mut self) -> Result<()> {
        let document = self.document;

        for decl in &document.scalars {
            let Some(id) = self.graph.find_scalar(&decl.name) else {
                continue;
            };
            if let Some(values) = &decl.known_values {
                let values = self.graph.resolve_type(values)?;
                self.graph.set_known_values(id, values);
            }
            if let Some(resource) = &decl.resource_location {
                let resource = self
                    .graph
                    .find_shape(resource)
                    .ok_or_else(|| LrometaError::UnknownType(resource.clone()))?;
                self.graph.set_resource_location(id, resource);
            }
        }

        for decl in &document.unions {
            let Some(id) = self.graph.find_union(&decl.name) else {
                continue;
            };
            for variant in &decl.variants {
                let ty = resolve_type_expr(&mut self.graph, &variant.ty)?;
                self.graph.push_variant(
                    id,
                    UnionVariant {
                        name: variant.name.clone(),
                        ty,
                    },
                );
            }
        }

        for (decl, shape) in document.shapes.iter().zip(self.shapes.clone()) {
            if let Some(base) = &decl.base {
                let base = self
                    .graph
                    .find_shape(base)
                    .ok_or_else(|| LrometaError::UnknownType(base.clone()))?;
                self.graph.set_base(shape, base);
            }
            self.add_properties(shape, &decl.properties)?;
        }

        for (decl, op) in document.operations.iter().zip(self.operations.clone()) {
            if !decl.parameters.is_empty() {
                let params = self.graph.add_shape(&parameters_shape_name(decl))?;
                self.add_properties(params, &decl.parameters)?;
                self.graph.set_parameters(op, params);
            }
            for response in &decl.responses {
                let ty = resolve_type_expr(&mut self.graph, &response.ty)?;
                self.graph.push_response(
                    op,
                    Response {
                        status: response.status,
                        ty,
                        error: response.error,
                    },
                );
            }
            if let Some(resource) = &decl.resource {
                let resource_type = match &resource.ty {
                    Some(name) => Some(
                        self.graph
                            .find_shape(name)
                            .ok_or_else(|| LrometaError::UnknownType(name.clone()))?,
                    ),
                    None => None,
                };
                self.graph.set_resource(op, resource.kind, resource_type);
            }
            self.graph.set_action(op, decl.action);
        }
        Ok(())
    }

    fn add_properties(
        &mut self,
        shape: ShapeId,
        properties: &IndexMap<String, PropertyDecl>,
    ) -> Result<()> {
        for (name, decl) in properties {
            let detail = decl.detail();
            let ty = resolve_type_expr(&mut self.graph, &detail.ty)?;
            let prop = self
                .graph
                .add_property(shape, name, ty, location(&detail, name))?;
            self.graph.set_key(prop, detail.key);
        }
        Ok(())
    }

    //=== Pass 3: markers ===

    /// Every declared property with its declaration, shapes before
    /// operation parameters
    fn declared_properties(&self) -> Vec<(PropertyId, PropertyDetail)> {
        let mut declared = Vec::new();
        for (decl, shape) in self.document.shapes.iter().zip(&self.shapes) {
            for (name, property) in &decl.properties {
                if let Some(prop) = self.graph.shape(*shape).properties.get(name) {
                    declared.push((*prop, property.detail()));
                }
            }
        }
        for (decl, op) in self.document.operations.iter().zip(&self.operations) {
            let Some(params) = self.graph.operation(*op).parameters else {
                continue;
            };
            for (name, property) in &decl.parameters {
                if let Some(prop) = self.graph.shape(params).properties.get(name) {
                    declared.push((*prop, property.detail()));
                }
            }
        }
        declared
    }

    fn mark(&mut self) -> Result<()> {
        for (prop, detail) in self.declared_properties() {
            if detail.lro_status {
                self.annotations.mark_lro_status(StatusTarget::Property(prop));
            }
            if detail.lro_result {
                self.annotations.mark_lro_result(prop);
            }
            if detail.lro_error_result {
                self.annotations.mark_lro_error_result(prop);
            }
            if let Some(target) = &detail.polling_parameter {
                self.annotations.set_polling_parameter(prop, target);
            }
            match &detail.polling_location {
                Some(PollingLocationDecl::Flag(true))
                | Some(PollingLocationDecl::StatusMonitor(_)) => {
                    self.annotations.mark_polling_location(prop);
                }
                Some(PollingLocationDecl::Flag(false)) | None => {}
            }
            match &detail.final_location {
                Some(FinalLocationDecl::Flag(true)) => {
                    self.annotations.mark_final_location(prop, None);
                }
                Some(FinalLocationDecl::Target { result }) => {
                    let model = response_model(&mut self.graph, result)?;
                    self.annotations.mark_final_location(prop, Some(model));
                }
                Some(FinalLocationDecl::Flag(false)) | None => {}
            }
        }

        for decl in &self.document.enums {
            let Some(id) = self.graph.find_enum(&decl.name) else {
                continue;
            };
            if decl.lro_status {
                self.annotations.mark_lro_status(StatusTarget::Enum(id));
            }
            for member in &decl.members {
                if let Some(terminal) = member.terminal() {
                    let member = MemberRef::EnumMember {
                        owner: id,
                        name: member.name().to_string(),
                    };
                    self.annotations.mark_terminal_state(member, terminal.into());
                }
            }
        }

        for decl in &self.document.unions {
            let Some(id) = self.graph.find_union(&decl.name) else {
                continue;
            };
            if decl.lro_status {
                self.annotations.mark_lro_status(StatusTarget::Union(id));
            }
            for (index, variant) in decl.variants.iter().enumerate() {
                if let Some(terminal) = variant.terminal {
                    let member = MemberRef::UnionVariant { owner: id, index };
                    self.annotations.mark_terminal_state(member, terminal.into());
                }
            }
        }
        Ok(())
    }

    //=== Pass 4: polling locations ===

    fn attach_polling_locations(&mut self) -> Result<()> {
        for (prop, detail) in self.declared_properties() {
            let Some(PollingLocationDecl::StatusMonitor(options)) = &detail.polling_location else {
                continue;
            };
            let polling_model = response_model(&mut self.graph, &options.polling_model)?;
            let final_result = match &options.final_result {
                Some(expr) => Some(response_model(&mut self.graph, expr)?),
                None => None,
            };
            let info = extract_polling_location_info(
                &self.graph,
                &self.annotations,
                prop,
                Some(polling_model),
                options.final_property.as_deref(),
                self.names,
            );
            match info {
                Some(mut info) => {
                    if final_result.is_some() {
                        info.final_result = final_result;
                    }
                    self.annotations.set_polling_location_info(prop, info);
                }
                None => log::warn!(
                    "{}: polling model {} is not a usable status monitor",
                    self.graph.property_label(prop),
                    options.polling_model
                ),
            }
        }
        Ok(())
    }

    //=== Pass 5: operation links ===

    fn link_operations(&mut self) -> Result<()> {
        let document = self.document;
        for (decl, op) in document.operations.iter().zip(self.operations.clone()) {
            if let Some(link) = &decl.polling_operation {
                let metadata = self.resolve_link(op, link, LinkKind::Polling)?;
                self.validate_polling_link(op, &metadata);
                self.annotations.set_operation_link(op, metadata);
            }
            if let Some(link) = &decl.final_operation {
                let metadata = self.resolve_link(op, link, LinkKind::Final)?;
                self.validate_final_link(&metadata);
                self.annotations.set_operation_link(op, metadata);
            }
        }
        Ok(())
    }

    fn resolve_link(
        &mut self,
        op: OperationId,
        link: &LinkDecl,
        kind: LinkKind,
    ) -> Result<OperationLinkMetadata> {
        let target = self.graph.resolve_operation(&link.operation)?;
        let explicit: IndexMap<String, Option<ParameterMapping>> = link
            .parameters
            .iter()
            .map(|(name, decl)| (name.clone(), parameter_mapping(decl)))
            .collect();
        let resolved = resolve_operation_link(
            &self.graph,
            &self.annotations,
            op,
            target,
            kind,
            &explicit,
            self.names,
        );
        Ok(self.collector.pipe(resolved))
    }

    fn validate_polling_link(&mut self, op: OperationId, metadata: &OperationLinkMetadata) {
        let target = self.graph.operation(metadata.linked_operation).qualified_name();
        let result = metadata.result.as_ref();

        let Some(shape) = result.and_then(|result| result.shape) else {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::PollingOperationReturnModel,
                target,
                "An operation annotated with @pollingOperation must return a model or union of model.",
            ));
            return;
        };

        if result.and_then(|result| result.status_monitor.as_ref()).is_none() {
            self.report_status_monitor_gaps(&target, shape);
        }

        if metadata.link.is_none() && metadata.parameter_map.is_none() {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::PollingOperationNoRefOrLink,
                self.graph.operation(op).qualified_name(),
                "An operation decorated with '@pollingOperation' must either return a response with an 'Operation-Location' header that will contain a runtime link to the polling operation, or specify parameters and return type properties to map into the polling operation parameters.  A map into polling operation parameters can be created using the '@pollingOperationParameter' decorator",
            ));
        }
    }

    fn report_status_monitor_gaps(&mut self, target: &str, shape: ShapeId) {
        let status = find_lro_status_property(&self.graph, &self.annotations, shape)
            .or_else(|| self.graph.property_named(shape, "status"))
            .or_else(|| self.graph.property_named(shape, "provisioningState"));
        let states = status
            .and_then(|prop| classify_property_states(&self.graph, &self.annotations, prop).value);
        let Some(states) = states else {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::PollingOperationNoStatusMonitor,
                target,
                "The operation linked in @pollingOperation must return a valid status monitor. The status monitor model must contain a 'status' property, or a property decorated with '@lroStatus'. The status field must be of Enum or Union type and contain terminal status values for success and failure.",
            ));
            return;
        };
        if states.succeeded_state.is_empty() {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::PollingOperationNoLroSuccess,
                target,
                "The status monitor returned from the polling operation must have a status property, with a known status value the indicates successful completion. This known value may be named 'Succeeded' or marked with the '@lroSucceeded' decorator.",
            ));
        }
        if states.failed_state.is_empty() {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::PollingOperationNoLroFailure,
                target,
                "The status monitor returned from the polling operation must have a status property, with a known status value the indicates failure. This known value may be named 'Failed' or marked with the '@lroFailed' decorator.",
            ));
        }
    }

    fn validate_final_link(&mut self, metadata: &OperationLinkMetadata) {
        let has_model = metadata
            .result
            .as_ref()
            .is_some_and(|result| result.shape.is_some());
        if !has_model {
            self.collector.add(Diagnostic::new(
                DiagnosticCode::InvalidFinalOperation,
                self.graph.operation(metadata.linked_operation).qualified_name(),
                "The operation linked in the '@finalOperation' decorator must have a 200 response that includes a model.",
            ));
        }
    }

    //=== Pass 6: final-state overrides ===

    fn final_state_overrides(&mut self) {
        let document = self.document;
        for (decl, op) in document.operations.iter().zip(self.operations.clone()) {
            let Some(raw) = &decl.final_state_via else {
                continue;
            };
            let Some(value) = FinalStateValue::parse(raw) else {
                self.collector.add(Diagnostic::new(
                    DiagnosticCode::InvalidFinalState,
                    self.graph.operation(op).qualified_name(),
                    format!(
                        "The final state value '{}' is not valid for this operation. It must be one of 'original-uri', 'location', 'azure-async-operation' or 'operation-location'.",
                        raw
                    ),
                ));
                continue;
            };
            let validated = self.collector.pipe(validate_final_state(&self.graph, op, value));
            match validated {
                Some(valid) => self.annotations.set_final_state_override(op, valid),
                // PUT keeps the declared value for tooling even when invalid
                None if decl.verb == HttpVerb::Put => {
                    self.annotations.set_final_state_override(op, value)
                }
                None => {}
            }
        }
    }

    //=== Pass 7: status types ===

    fn check_status_types(&mut self) {
        let targets: Vec<StatusTarget> = self.annotations.lro_status_targets().copied().collect();
        let mut found: Vec<Diagnostic> = targets
            .into_iter()
            .flat_map(|target| {
                get_long_running_states(&self.graph, &self.annotations, target).diagnostics
            })
            .collect();
        found.sort_by(|a, b| {
            a.target
                .cmp(&b.target)
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });
        self.collector.extend(found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::TerminalState;
    use crate::graph::StatusCode;

    fn load(yaml: &str) -> Diagnosed<LoadedDocument> {
        let document = ApiDocument::from_yaml_str(yaml).unwrap();
        load_document(&document, &ResultNames::default()).unwrap()
    }

    const POLLING: &str = r#"
enums:
  - name: JobState
    members: [Running, Succeeded, Failed]
shapes:
  - name: Job
    properties:
      id: string
  - name: JobStatus
    properties:
      id: string
      status: JobState
      result: Job
  - name: JobAccepted
    properties:
      jobId: string
operations:
  - name: getStatus
    verb: get
    path: /jobs/{jobId}
    parameters:
      jobId:
        type: string
        location: path
    responses:
      - status: 200
        type: JobStatus
  - name: startJob
    verb: post
    path: /jobs
    responses:
      - status: 202
        type: JobAccepted
    pollingOperation:
      operation: getStatus
      parameters:
        jobId:
          responseProperty: jobId
"#;

    #[test]
    fn test_declarations_and_types() {
        let loaded = load(
            r#"
namespace: Contoso
scalars:
  - name: stateString
    base: string
    knownValues: State
enums:
  - name: State
    members:
      - name: Done
        value: done
        terminal: succeeded
      - Failed
unions:
  - name: Mixed
    variants:
      - type: '"Running"'
      - name: Finished
        type: '"Complete"'
shapes:
  - name: Widget
    properties:
      name:
        type: string
        key: true
  - name: Holder
    properties:
      location:
        type: ResourceLocation<Widget>
        location: header
        header: Location
"#,
        )
        .value;
        let graph = &loaded.graph;
        let widget = graph.find_shape("Widget").unwrap();
        assert_eq!(graph.shape(widget).namespace.as_deref(), Some("Contoso"));
        let name = graph.property_named(widget, "name").unwrap();
        assert!(graph.property(name).key);

        let state = graph.find_enum("State").unwrap();
        assert_eq!(graph.enum_type(state).members[0].value.as_deref(), Some("done"));
        assert_eq!(
            loaded.annotations.terminal_state(&MemberRef::EnumMember {
                owner: state,
                name: "Done".into()
            }),
            Some(TerminalState::Succeeded)
        );

        let scalar = graph.find_scalar("stateString").unwrap();
        assert_eq!(graph.scalar(scalar).known_values, Some(TypeRef::Enum(state)));

        let mixed = graph.find_union("Mixed").unwrap();
        let variants = &graph.union_type(mixed).variants;
        assert_eq!(variants[0].ty, TypeRef::StringLiteral("Running".into()));
        assert_eq!(variants[1].name.as_deref(), Some("Finished"));

        let holder = graph.find_shape("Holder").unwrap();
        let location = graph.property_named(holder, "location").unwrap();
        assert_eq!(graph.header_name(location), Some("Location"));
        let TypeRef::Scalar(id) = graph.property(location).ty else {
            panic!("expected a scalar");
        };
        assert_eq!(graph.resource_location_target(id), Some(widget));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let document = ApiDocument::from_yaml_str(
            "shapes:\n  - name: A\n    properties:\n      b: Missing\n",
        )
        .unwrap();
        let result = load_document(&document, &ResultNames::default());
        assert!(matches!(result, Err(LrometaError::UnknownType(name)) if name == "Missing"));
    }

    #[test]
    fn test_duplicate_shape_is_an_error() {
        let document =
            ApiDocument::from_yaml_str("shapes:\n  - name: A\n  - name: A\n").unwrap();
        let result = load_document(&document, &ResultNames::default());
        assert!(matches!(result, Err(LrometaError::DuplicateName(_))));
    }

    #[test]
    fn test_operation_parameters_and_responses() {
        let loaded = load(POLLING).value;
        let graph = &loaded.graph;
        let get_status = graph.find_operation("getStatus").unwrap();
        let operation = graph.operation(get_status);
        assert_eq!(operation.verb, HttpVerb::Get);
        assert_eq!(operation.responses[0].status, StatusCode::Code(200));
        let params = graph.request_parameters(get_status);
        assert_eq!(params.len(), 1);
        assert_eq!(graph.property(params[0]).location, PropertyLocation::Path);
        assert!(graph.find_shape("getStatus.parameters").is_some());
    }

    #[test]
    fn test_polling_link_resolved() {
        let loaded = load(POLLING);
        assert!(loaded.diagnostics.is_empty(), "{:?}", loaded.diagnostics);
        let loaded = loaded.value;
        let start = loaded.graph.find_operation("startJob").unwrap();
        let link = loaded
            .annotations
            .operation_link(start, LinkKind::Polling)
            .unwrap();
        assert_eq!(link.linked_operation, loaded.graph.find_operation("getStatus").unwrap());
        assert!(link.parameter_map.as_ref().unwrap().contains_key("jobId"));
        let result = link.result.as_ref().unwrap();
        assert!(result.status_monitor.is_some());
    }

    #[test]
    fn test_polling_link_without_failure_state() {
        let yaml = POLLING.replace("[Running, Succeeded, Failed]", "[Running, Succeeded]");
        let loaded = load(&yaml);
        assert!(loaded.has(DiagnosticCode::PollingOperationNoLroFailure));
        assert!(!loaded.has(DiagnosticCode::PollingOperationNoLroSuccess));
        assert!(!loaded.has(DiagnosticCode::PollingOperationNoStatusMonitor));
    }

    #[test]
    fn test_polling_link_without_status() {
        let yaml = POLLING.replace("      status: JobState\n", "      state: JobState\n");
        let loaded = load(&yaml);
        assert!(loaded.has(DiagnosticCode::PollingOperationNoStatusMonitor));
    }

    #[test]
    fn test_invalid_parameter_mapping() {
        let yaml = POLLING.replace(
            "          responseProperty: jobId\n",
            "          responseProperty: jobId\n          requestParameter: jobId\n",
        );
        let loaded = load(&yaml);
        assert!(loaded.has(DiagnosticCode::OperationLinkParameterInvalid));
    }

    #[test]
    fn test_final_state_override_validation() {
        let loaded = load(
            r#"
shapes:
  - name: Widget
    properties:
      name: string
operations:
  - name: replace
    verb: put
    path: /widgets/{name}
    responses:
      - status: 200
        type: Widget
    finalStateVia: location
  - name: act
    verb: post
    path: /widgets:act
    responses:
      - status: 200
        type: Widget
    finalStateVia: original-uri
  - name: update
    verb: patch
    path: /widgets/{name}
    responses:
      - status: 200
        type: Widget
    finalStateVia: original-uri
  - name: bogus
    verb: post
    path: /widgets:bogus
    responses:
      - status: 200
        type: Widget
    finalStateVia: somewhere
"#,
        );
        let invalid: Vec<&str> = loaded
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::InvalidFinalState)
            .map(|d| d.target.as_str())
            .collect();
        assert_eq!(invalid, vec!["replace", "act", "bogus"]);

        let loaded = loaded.value;
        let op = |name: &str| loaded.graph.find_operation(name).unwrap();
        assert_eq!(
            loaded.annotations.final_state_override(op("replace")),
            Some(FinalStateValue::Location)
        );
        assert_eq!(loaded.annotations.final_state_override(op("act")), None);
        assert_eq!(
            loaded.annotations.final_state_override(op("update")),
            Some(FinalStateValue::OriginalUri)
        );
        assert_eq!(loaded.annotations.final_state_override(op("bogus")), None);
    }

    #[test]
    fn test_status_marker_diagnostics() {
        let loaded = load(
            r#"
enums:
  - name: Partial
    lroStatus: true
    members: [Running, Succeeded]
unions:
  - name: Numeric
    lroStatus: true
    variants:
      - type: '"Succeeded"'
      - type: int32
"#,
        );
        assert!(loaded.has(DiagnosticCode::LroStatusMissing));
        assert!(loaded.has(DiagnosticCode::LroStatusUnionNonString));
    }

    #[test]
    fn test_polling_location_options() {
        let loaded = load(
            r#"
enums:
  - name: State
    members: [Running, Succeeded, Failed]
shapes:
  - name: Widget
    properties:
      name: string
  - name: Monitor
    properties:
      status: State
      output: Widget
  - name: Accepted
    properties:
      monitor:
        type: url
        pollingLocation:
          pollingModel: Monitor
          finalProperty: output
"#,
        )
        .value;
        let accepted = loaded.graph.find_shape("Accepted").unwrap();
        let prop = loaded.graph.property_named(accepted, "monitor").unwrap();
        assert!(loaded.annotations.is_polling_location(prop));
        let info = loaded.annotations.polling_location_info(prop).unwrap();
        let widget = loaded.graph.find_shape("Widget").unwrap();
        assert_eq!(info.final_result, Some(ResponseModel::Shape(widget)));
        assert_eq!(
            info.info.success_property,
            loaded.graph.property_named(loaded.graph.find_shape("Monitor").unwrap(), "output")
        );
    }

    #[test]
    fn test_engine_from_loaded_document() {
        let loaded = load(POLLING).value;
        let engine = loaded.engine(EngineOptions::default());
        let start = loaded.graph.find_operation("startJob").unwrap();
        assert!(engine.is_long_running(start));
        let get_status = loaded.graph.find_operation("getStatus").unwrap();
        assert!(!engine.is_long_running(get_status));
    }
}
