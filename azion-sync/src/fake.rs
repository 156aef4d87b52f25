//! In-memory [`EdgeFunctionApi`] for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use azion_core::{EdgeFunctionRecord, FieldPatch, FunctionId, NewEdgeFunction, Token};

use crate::client::{EdgeFunctionApi, Page};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    List { token: String, url: Option<String> },
    Patch { token: String, id: FunctionId, body: Value },
    Create { token: String, name: String },
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub pages: RefCell<VecDeque<Result<Page, ApiError>>>,
    pub patches: RefCell<VecDeque<Result<Value, ApiError>>>,
    pub creates: RefCell<VecDeque<Result<EdgeFunctionRecord, ApiError>>>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeApi {
    pub fn with_pages(pages: Vec<Result<Page, ApiError>>) -> Self {
        Self {
            pages: RefCell::new(pages.into()),
            ..Self::default()
        }
    }

    pub fn with_patch(response: Result<Value, ApiError>) -> Self {
        let api = Self::default();
        api.patches.borrow_mut().push_back(response);
        api
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

pub(crate) fn page(results: Vec<EdgeFunctionRecord>, next: Option<&str>) -> Page {
    Page {
        results,
        next: next.map(str::to_owned),
    }
}

impl EdgeFunctionApi for FakeApi {
    fn list_page(&self, token: &Token, url: Option<&str>) -> Result<Page, ApiError> {
        self.calls.borrow_mut().push(Call::List {
            token: token.expose().to_owned(),
            url: url.map(str::to_owned),
        });
        self.pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted page".into())))
    }

    fn patch(&self, token: &Token, id: FunctionId, patch: &FieldPatch) -> Result<Value, ApiError> {
        self.calls.borrow_mut().push(Call::Patch {
            token: token.expose().to_owned(),
            id,
            body: patch.body(),
        });
        self.patches
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted patch".into())))
    }

    fn create(
        &self,
        token: &Token,
        function: &NewEdgeFunction,
    ) -> Result<EdgeFunctionRecord, ApiError> {
        self.calls.borrow_mut().push(Call::Create {
            token: token.expose().to_owned(),
            name: function.name.clone(),
        });
        self.creates
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted create".into())))
    }
}
