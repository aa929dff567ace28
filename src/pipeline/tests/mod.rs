mod support;

mod continuation;
