use std::cmp::Ordering;
use std::fmt;

use http::Method;

use super::RequestCondition;
use crate::error::RoutingError;
use crate::request::RequestDescriptor;

/// Set of HTTP methods a route accepts.
///
/// An empty set accepts every method except `OPTIONS`. A declared `GET`
/// also serves `HEAD` requests, ranked below an explicit `HEAD` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MethodsCondition {
    /// Sorted by method name and deduplicated, so equality is set equality.
    methods: Vec<Method>,
}

impl MethodsCondition {
    pub fn new<I: IntoIterator<Item = Method>>(methods: I) -> Self {
        let mut methods: Vec<Method> = methods.into_iter().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods.dedup();
        Self { methods }
    }

    /// Parse method tokens such as `["GET", "post"]`.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, RoutingError> {
        let methods = tokens
            .iter()
            .map(|t| {
                let token = t.as_ref().trim().to_ascii_uppercase();
                Method::from_bytes(token.as_bytes()).map_err(|e| RoutingError::InvalidMapping {
                    value: t.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(methods))
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    fn match_method(&self, method: &Method) -> Option<Self> {
        if self.contains(method) {
            return Some(Self::new([method.clone()]));
        }
        if *method == Method::HEAD && self.contains(&Method::GET) {
            return Some(Self::new([Method::GET]));
        }
        None
    }

    fn match_preflight(&self, request: &RequestDescriptor) -> Option<Self> {
        if self.methods.is_empty() {
            return Some(self.clone());
        }
        let expected = request.access_control_request_method()?;
        self.match_method(&expected)
    }
}

impl RequestCondition for MethodsCondition {
    fn combine(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        Self::new(self.methods.iter().chain(other.methods.iter()).cloned())
    }

    fn matching(&self, request: &RequestDescriptor) -> Result<Option<Self>, RoutingError> {
        if request.is_preflight() {
            return Ok(self.match_preflight(request));
        }
        if self.methods.is_empty() {
            // OPTIONS is never matched implicitly.
            return Ok((*request.method() != Method::OPTIONS).then(|| self.clone()));
        }
        Ok(self.match_method(request.method()))
    }

    /// Expects both sides to be the result of [`RequestCondition::matching`]
    /// for the same request, i.e. holding at most one method each.
    fn compare(&self, other: &Self, _request: &RequestDescriptor) -> Ordering {
        if self.methods.len() != other.methods.len() {
            return other.methods.len().cmp(&self.methods.len());
        }
        if self.methods.len() == 1 {
            if self.contains(&Method::HEAD) && other.contains(&Method::GET) {
                return Ordering::Less;
            }
            if self.contains(&Method::GET) && other.contains(&Method::HEAD) {
                return Ordering::Greater;
            }
        }
        Ordering::Equal
    }

    fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Display for MethodsCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        write!(f, "{}", names.join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> RequestDescriptor {
        RequestDescriptor::new(Method::GET, path)
    }

    #[test]
    fn test_combine_is_union() {
        let a = MethodsCondition::new([Method::GET]);
        let b = MethodsCondition::new([Method::POST]);
        let combined = a.combine(&b);
        assert_eq!(combined.methods(), &[Method::GET, Method::POST]);
        assert!(a.contains(&Method::GET) && !a.contains(&Method::POST));
    }

    #[test]
    fn test_combine_with_empty_is_identity() {
        let a = MethodsCondition::new([Method::PUT]);
        let empty = MethodsCondition::default();
        assert_eq!(a.combine(&empty), a);
        assert_eq!(empty.combine(&a), a);
    }

    #[test]
    fn test_empty_matches_everything_but_options() {
        let empty = MethodsCondition::default();
        assert!(empty.matching(&get("/x")).unwrap().is_some());
        let options = RequestDescriptor::new(Method::OPTIONS, "/x");
        assert!(empty.matching(&options).unwrap().is_none());
    }

    #[test]
    fn test_matching_narrows_to_request_method() {
        let cond = MethodsCondition::new([Method::GET, Method::POST]);
        let post = RequestDescriptor::new(Method::POST, "/x");
        let narrowed = cond.matching(&post).unwrap().unwrap();
        assert_eq!(narrowed.methods(), &[Method::POST]);
        assert_eq!(cond.methods().len(), 2);
    }

    #[test]
    fn test_head_served_by_get_but_ranked_lower() {
        let head = RequestDescriptor::new(Method::HEAD, "/x");
        let implicit = MethodsCondition::new([Method::GET])
            .matching(&head)
            .unwrap()
            .unwrap();
        assert_eq!(implicit.methods(), &[Method::GET]);

        let explicit = MethodsCondition::new([Method::HEAD])
            .matching(&head)
            .unwrap()
            .unwrap();
        assert_eq!(explicit.compare(&implicit, &head), Ordering::Less);
        assert_eq!(implicit.compare(&explicit, &head), Ordering::Greater);
    }

    #[test]
    fn test_declared_method_beats_empty() {
        let req = get("/x");
        let declared = MethodsCondition::new([Method::GET]).matching(&req).unwrap().unwrap();
        let any = MethodsCondition::default().matching(&req).unwrap().unwrap();
        assert_eq!(declared.compare(&any, &req), Ordering::Less);
    }

    #[test]
    fn test_preflight_uses_requested_method() {
        let preflight = RequestDescriptor::new(Method::OPTIONS, "/x")
            .with_header("Origin", "https://a.example")
            .with_header("Access-Control-Request-Method", "POST");
        let post_only = MethodsCondition::new([Method::POST]);
        assert!(post_only.matching(&preflight).unwrap().is_some());
        let get_only = MethodsCondition::new([Method::GET]);
        assert!(get_only.matching(&preflight).unwrap().is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MethodsCondition::parse(&["get", "PATCH"]).is_ok());
        assert!(MethodsCondition::parse(&["GE T"]).is_err());
    }
}
