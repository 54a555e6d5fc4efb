use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::warn;

use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Application-defined condition plugged into a [`super::RouteCondition`].
///
/// Implementations follow the same contract as the built-in conditions.
/// `content` identifies the condition for equality, hashing and display, so
/// two instances of the same type with the same content are interchangeable.
pub trait CustomCondition: fmt::Debug + Send + Sync + 'static {
    fn content(&self) -> String;

    /// Called only with another instance of the same concrete type.
    fn combine(&self, other: &dyn CustomCondition) -> Arc<dyn CustomCondition>;

    fn matching(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Option<Arc<dyn CustomCondition>>, RoutingError>;

    /// Called only with another instance of the same concrete type.
    fn compare(&self, other: &dyn CustomCondition, request: &RequestDescriptor) -> Ordering;

    fn as_any(&self) -> &dyn Any;
}

/// Optional custom condition. An absent condition matches every request.
#[derive(Debug, Clone, Default)]
pub struct CustomConditionHolder {
    condition: Option<Arc<dyn CustomCondition>>,
}

impl CustomConditionHolder {
    pub fn new(condition: Arc<dyn CustomCondition>) -> Self {
        Self {
            condition: Some(condition),
        }
    }

    pub fn condition(&self) -> Option<&Arc<dyn CustomCondition>> {
        self.condition.as_ref()
    }

    fn same_type(a: &dyn CustomCondition, b: &dyn CustomCondition) -> bool {
        a.as_any().type_id() == b.as_any().type_id()
    }
}

impl RequestCondition for CustomConditionHolder {
    fn combine(&self, other: &Self) -> Self {
        match (&self.condition, &other.condition) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => {
                if Self::same_type(a.as_ref(), b.as_ref()) {
                    Self::new(a.combine(b.as_ref()))
                } else {
                    warn!(
                        type_level = %a.content(),
                        method_level = %b.content(),
                        "Custom conditions of different types cannot be combined; keeping method-level"
                    );
                    other.clone()
                }
            }
        }
    }

    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        match &self.condition {
            None => Ok(Some(self.clone())),
            Some(condition) => Ok(condition.matching(request)?.map(Self::new)),
        }
    }

    fn compare(&self, other: &Self, request: &RequestDescriptor) -> Ordering {
        match (&self.condition, &other.condition) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) if Self::same_type(a.as_ref(), b.as_ref()) => {
                a.compare(b.as_ref(), request)
            }
            _ => Ordering::Equal,
        }
    }

    fn is_empty(&self) -> bool {
        self.condition.is_none()
    }
}

impl PartialEq for CustomConditionHolder {
    fn eq(&self, other: &Self) -> bool {
        match (&self.condition, &other.condition) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                Self::same_type(a.as_ref(), b.as_ref()) && a.content() == b.content()
            }
            _ => false,
        }
    }
}

impl Eq for CustomConditionHolder {}

impl Hash for CustomConditionHolder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.condition {
            None => 0u8.hash(state),
            Some(condition) => {
                1u8.hash(state);
                condition.as_any().type_id().hash(state);
                condition.content().hash(state);
            }
        }
    }
}

impl fmt::Display for CustomConditionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(condition) => f.write_str(&condition.content()),
            None => Ok(()),
        }
    }
}
