//! Value model for the inspection engine
//!
//! A closed tagged union over every category the formatter
//! distinguishes. Containers are `Rc`-backed so shared and circular
//! structure is expressible; identity for cycle detection is the `Rc`
//! allocation address.

use std::cell::RefCell;
use std::rc::Rc;

/// Fallible accessor evaluated when getter rendering is enabled.
pub type Accessor = Rc<dyn Fn() -> Result<Value, String>>;

/// Custom-inspection hook: receives the remaining depth budget and
/// yields either replacement text or a replacement value.
pub type InspectHook = Rc<dyn Fn(Option<u32>) -> InspectReturn>;

/// What a custom-inspection hook produced.
pub enum InspectReturn {
    Text(String),
    Val(Value),
}

/// A property key: a plain string or a symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropKey {
    Str(String),
    Sym(String),
}

/// A property's payload: a data value or an accessor pair.
#[derive(Clone)]
pub enum PropValue {
    Data(Value),
    Getter(Accessor),
    Setter,
    GetterSetter(Accessor),
}

/// One named member of an object-like value.
#[derive(Clone)]
pub struct Property {
    pub key: PropKey,
    pub value: PropValue,
    /// Non-enumerable members render only under `showHidden`, inside
    /// brackets.
    pub enumerable: bool,
}

impl Property {
    pub fn new(key: &str, value: Value) -> Self {
        Self {
            key: PropKey::Str(key.to_string()),
            value: PropValue::Data(value),
            enumerable: true,
        }
    }

    pub fn hidden(key: &str, value: Value) -> Self {
        Self {
            key: PropKey::Str(key.to_string()),
            value: PropValue::Data(value),
            enumerable: false,
        }
    }

    pub fn symbol(desc: &str, value: Value) -> Self {
        Self {
            key: PropKey::Sym(desc.to_string()),
            value: PropValue::Data(value),
            enumerable: true,
        }
    }

    pub fn getter(key: &str, accessor: Accessor) -> Self {
        Self {
            key: PropKey::Str(key.to_string()),
            value: PropValue::Getter(accessor),
            enumerable: true,
        }
    }

    pub fn getter_setter(key: &str, accessor: Accessor) -> Self {
        Self {
            key: PropKey::Str(key.to_string()),
            value: PropValue::GetterSetter(accessor),
            enumerable: true,
        }
    }

    pub fn setter(key: &str) -> Self {
        Self {
            key: PropKey::Str(key.to_string()),
            value: PropValue::Setter,
            enumerable: true,
        }
    }
}

/// Element kind of a typed numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    pub fn bytes_per_element(&self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    /// Whether elements carry the big-integer width marker.
    pub fn is_bigint(&self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }
}

/// Elements of a typed array, numeric or big-integer width.
#[derive(Clone, Debug)]
pub enum TypedElements {
    Num(Vec<f64>),
    Big(Vec<i128>),
}

#[derive(Clone, Debug)]
pub struct TypedArrayData {
    pub kind: TypedArrayKind,
    pub elements: TypedElements,
}

impl TypedArrayData {
    pub fn len(&self) -> usize {
        match &self.elements {
            TypedElements::Num(v) => v.len(),
            TypedElements::Big(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which collection an iterator preview came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    Map,
    Set,
}

#[derive(Clone)]
pub struct IterData {
    pub kind: IterKind,
    pub items: Vec<Value>,
}

#[derive(Clone)]
pub struct DataViewData {
    pub buffer: Rc<Vec<u8>>,
    pub byte_offset: usize,
    pub byte_length: usize,
}

/// Settlement state of a promise value.
#[derive(Clone)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// Best-effort previews of weak collections; the true size may exceed
/// what is retrievable.
#[derive(Clone)]
pub struct WeakSetData {
    pub preview: Vec<Value>,
}

#[derive(Clone)]
pub struct WeakMapData {
    pub preview: Vec<(Value, Value)>,
}

#[derive(Clone)]
pub struct BoxedData {
    /// Wrapper class name: "String", "Number", "Boolean", "BigInt",
    /// "Symbol".
    pub class: &'static str,
    pub value: Value,
}

#[derive(Clone)]
pub struct FunctionData {
    pub name: String,
    pub is_class: bool,
    pub props: RefCell<Vec<Property>>,
}

#[derive(Clone)]
pub struct RegexData {
    pub source: String,
    pub flags: String,
}

#[derive(Clone)]
pub struct ErrorData {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub props: RefCell<Vec<Property>>,
}

#[derive(Clone)]
pub struct ObjectData {
    /// Constructor label; `None` renders as a plain object.
    pub class_name: Option<String>,
    pub props: RefCell<Vec<Property>>,
    pub custom_inspect: Option<InspectHook>,
}

#[derive(Clone)]
pub struct ProxyData {
    pub target: Value,
    pub handler: Value,
}

/// An arbitrary runtime value, as seen by the inspector.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    BigInt(i128),
    Str(String),
    Sym(String),
    Array(Rc<RefCell<Vec<Option<Value>>>>),
    Set(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
    TypedArray(Rc<TypedArrayData>),
    Iter(Rc<IterData>),
    ArrayBuffer(Rc<Vec<u8>>),
    DataView(Rc<DataViewData>),
    Promise(Rc<RefCell<PromiseState>>),
    WeakSet(Rc<WeakSetData>),
    WeakMap(Rc<WeakMapData>),
    Namespace(Rc<ObjectData>),
    Boxed(Rc<BoxedData>),
    Function(Rc<FunctionData>),
    Regex(Rc<RegexData>),
    /// Milliseconds since the epoch; `None` is an invalid date.
    Date(Option<i64>),
    Error(Rc<ErrorData>),
    Object(Rc<ObjectData>),
    Proxy(Rc<ProxyData>),
}

impl Value {
    // =========================================================================
    // Builders
    // =========================================================================

    pub fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    pub fn symbol(desc: &str) -> Value {
        Value::Sym(desc.to_string())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items.into_iter().map(Some).collect())))
    }

    /// Array with explicit holes (`None` slots).
    pub fn sparse_array(slots: Vec<Option<Value>>) -> Value {
        Value::Array(Rc::new(RefCell::new(slots)))
    }

    /// Set builder; duplicate entries (by strict equality) collapse.
    pub fn set(items: Vec<Value>) -> Value {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.iter().any(|v| v.strict_equals(&item)) {
                unique.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(unique)))
    }

    /// Map builder; later entries with a duplicate key win.
    pub fn map(entries: Vec<(Value, Value)>) -> Value {
        let mut unique: Vec<(Value, Value)> = Vec::new();
        for (k, v) in entries {
            if let Some(existing) = unique.iter_mut().find(|(ek, _)| ek.strict_equals(&k)) {
                existing.1 = v;
            } else {
                unique.push((k, v));
            }
        }
        Value::Map(Rc::new(RefCell::new(unique)))
    }

    pub fn object(props: Vec<(&str, Value)>) -> Value {
        Value::Object(Rc::new(ObjectData {
            class_name: None,
            props: RefCell::new(
                props
                    .into_iter()
                    .map(|(k, v)| Property::new(k, v))
                    .collect(),
            ),
            custom_inspect: None,
        }))
    }

    pub fn object_named(class_name: &str, props: Vec<(&str, Value)>) -> Value {
        Value::Object(Rc::new(ObjectData {
            class_name: Some(class_name.to_string()),
            props: RefCell::new(
                props
                    .into_iter()
                    .map(|(k, v)| Property::new(k, v))
                    .collect(),
            ),
            custom_inspect: None,
        }))
    }

    pub fn object_with_props(class_name: Option<&str>, props: Vec<Property>) -> Value {
        Value::Object(Rc::new(ObjectData {
            class_name: class_name.map(str::to_string),
            props: RefCell::new(props),
            custom_inspect: None,
        }))
    }

    pub fn custom(class_name: Option<&str>, hook: InspectHook) -> Value {
        Value::Object(Rc::new(ObjectData {
            class_name: class_name.map(str::to_string),
            props: RefCell::new(Vec::new()),
            custom_inspect: Some(hook),
        }))
    }

    pub fn function(name: &str) -> Value {
        Value::Function(Rc::new(FunctionData {
            name: name.to_string(),
            is_class: false,
            props: RefCell::new(Vec::new()),
        }))
    }

    pub fn class(name: &str) -> Value {
        Value::Function(Rc::new(FunctionData {
            name: name.to_string(),
            is_class: true,
            props: RefCell::new(Vec::new()),
        }))
    }

    pub fn regex(source: &str, flags: &str) -> Value {
        Value::Regex(Rc::new(RegexData {
            source: source.to_string(),
            flags: flags.to_string(),
        }))
    }

    pub fn error(name: &str, message: &str, stack: Option<&str>) -> Value {
        Value::Error(Rc::new(ErrorData {
            name: name.to_string(),
            message: message.to_string(),
            stack: stack.map(str::to_string),
            props: RefCell::new(Vec::new()),
        }))
    }

    pub fn typed_array(kind: TypedArrayKind, elements: Vec<f64>) -> Value {
        Value::TypedArray(Rc::new(TypedArrayData {
            kind,
            elements: TypedElements::Num(elements),
        }))
    }

    pub fn big_typed_array(kind: TypedArrayKind, elements: Vec<i128>) -> Value {
        Value::TypedArray(Rc::new(TypedArrayData {
            kind,
            elements: TypedElements::Big(elements),
        }))
    }

    pub fn promise_pending() -> Value {
        Value::Promise(Rc::new(RefCell::new(PromiseState::Pending)))
    }

    pub fn promise_fulfilled(value: Value) -> Value {
        Value::Promise(Rc::new(RefCell::new(PromiseState::Fulfilled(value))))
    }

    pub fn promise_rejected(reason: Value) -> Value {
        Value::Promise(Rc::new(RefCell::new(PromiseState::Rejected(reason))))
    }

    // =========================================================================
    // Mutation helpers for building shared / circular structure
    // =========================================================================

    /// Append to an array value. Returns false for other categories.
    pub fn push(&self, value: Value) -> bool {
        match self {
            Value::Array(items) => {
                items.borrow_mut().push(Some(value));
                true
            }
            _ => false,
        }
    }

    /// Insert a data property on an object value. Returns false for
    /// other categories.
    pub fn insert_prop(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(obj) | Value::Namespace(obj) => {
                obj.props.borrow_mut().push(Property::new(key, value));
                true
            }
            Value::Function(f) => {
                f.props.borrow_mut().push(Property::new(key, value));
                true
            }
            Value::Error(e) => {
                e.props.borrow_mut().push(Property::new(key, value));
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Identity and equality
    // =========================================================================

    /// Identity of the backing allocation for container values; used
    /// for cycle detection. Primitives have no identity.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Set(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::TypedArray(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Iter(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::ArrayBuffer(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::DataView(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Promise(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::WeakSet(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::WeakMap(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Namespace(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Boxed(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Function(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Regex(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Error(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Proxy(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// Strict equality: value equality for primitives (NaN equals
    /// itself, zero signs collapse), reference identity for containers.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sym(_), Value::Sym(_)) => false,
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Whether the value formats as a bare primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Bool(_)
                | Value::Num(_)
                | Value::BigInt(_)
                | Value::Str(_)
                | Value::Sym(_)
        )
    }

    /// Label used for truncation placeholders (`[Array]`, `[Object]`).
    pub fn class_label(&self) -> String {
        match self {
            Value::Array(_) => "Array".to_string(),
            Value::Set(_) => "Set".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::TypedArray(t) => t.kind.name().to_string(),
            Value::Iter(i) => match i.kind {
                IterKind::Map => "Map Iterator".to_string(),
                IterKind::Set => "Set Iterator".to_string(),
            },
            Value::ArrayBuffer(_) => "ArrayBuffer".to_string(),
            Value::DataView(_) => "DataView".to_string(),
            Value::Promise(_) => "Promise".to_string(),
            Value::WeakSet(_) => "WeakSet".to_string(),
            Value::WeakMap(_) => "WeakMap".to_string(),
            Value::Namespace(_) => "Module".to_string(),
            Value::Boxed(b) => b.class.to_string(),
            Value::Function(_) => "Function".to_string(),
            Value::Regex(_) => "RegExp".to_string(),
            Value::Date(_) => "Date".to_string(),
            Value::Error(e) => e.name.clone(),
            Value::Object(o) => o
                .class_name
                .clone()
                .unwrap_or_else(|| "Object".to_string()),
            Value::Proxy(_) => "Proxy".to_string(),
            _ => "Object".to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
