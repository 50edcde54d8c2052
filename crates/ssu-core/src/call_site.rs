//! Call sites and declarations considered for annotation

use crate::types::InferredType;

/// Node kinds a rule asks the host to visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    MethodCall,
    NullsafeMethodCall,
    StaticCall,
    ClassMethod,
    ClassDeclaration,
}

/// How the receiver of a call site was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    Instance,
    Static,
    Declaration,
}

/// Receiver of a call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Object receiver typed by inference
    Instance(InferredType),

    /// Class named by a static call; `None` when the class expression is computed
    Static(Option<String>),

    /// Enclosing class of a method declaration
    Declaration { class: String },

    /// A class declaration itself, with the traits it uses
    ClassLike { class: String, traits: Vec<String> },
}

/// A resolved call or declaration node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub kind: NodeKind,
    /// Empty for class declarations
    pub method_name: String,
    pub receiver: Receiver,
}

impl CallSite {
    pub fn method_call(method_name: impl Into<String>, receiver_type: InferredType) -> Self {
        Self {
            kind: NodeKind::MethodCall,
            method_name: method_name.into(),
            receiver: Receiver::Instance(receiver_type),
        }
    }

    pub fn nullsafe_method_call(method_name: impl Into<String>, receiver_type: InferredType) -> Self {
        Self {
            kind: NodeKind::NullsafeMethodCall,
            ..Self::method_call(method_name, receiver_type)
        }
    }

    pub fn static_call(method_name: impl Into<String>, class: Option<String>) -> Self {
        Self {
            kind: NodeKind::StaticCall,
            method_name: method_name.into(),
            receiver: Receiver::Static(class),
        }
    }

    pub fn method_declaration(method_name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::ClassMethod,
            method_name: method_name.into(),
            receiver: Receiver::Declaration {
                class: class.into(),
            },
        }
    }

    pub fn class_declaration(class: impl Into<String>, traits: Vec<String>) -> Self {
        Self {
            kind: NodeKind::ClassDeclaration,
            method_name: String::new(),
            receiver: Receiver::ClassLike {
                class: class.into(),
                traits,
            },
        }
    }

    pub fn receiver_kind(&self) -> ReceiverKind {
        match self.receiver {
            Receiver::Instance(_) => ReceiverKind::Instance,
            Receiver::Static(_) => ReceiverKind::Static,
            Receiver::Declaration { .. } | Receiver::ClassLike { .. } => ReceiverKind::Declaration,
        }
    }

    /// Whether the receiver resolved to something the matcher can compare
    ///
    /// A union counts as known; members that are unknown simply never match.
    pub fn receiver_type_known(&self) -> bool {
        match &self.receiver {
            Receiver::Instance(ty) => !ty.is_unknown(),
            Receiver::Static(class) => class.is_some(),
            Receiver::Declaration { .. } | Receiver::ClassLike { .. } => true,
        }
    }

    /// Class names that plausibly name the receiver
    pub fn candidate_classes(&self) -> Vec<&str> {
        match &self.receiver {
            Receiver::Instance(ty) => ty.class_names(),
            Receiver::Static(class) => class.as_deref().into_iter().collect(),
            Receiver::Declaration { class } | Receiver::ClassLike { class, .. } => vec![class.as_str()],
        }
    }
}
